//! Framing properties over in-memory buffers and a loopback socket

use codec::{
    read_field, read_message_type, write_close, HelloMessage, MessageType, ProtocolError, ShareMessage,
    DEFAULT_MAX_FIELD_SIZE,
};
use proptest::prelude::*;
use std::collections::BTreeMap;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use types::{NodeIdentifier, RegionIdentifier};

type Payload = BTreeMap<String, Vec<f64>>;

fn encode_share(region: &str, payload: &Payload) -> Vec<u8> {
    let message = ShareMessage::encode(RegionIdentifier::new(region), payload).unwrap();
    let mut wire = Vec::new();
    tokio_test::block_on(message.write_to(&mut wire)).unwrap();
    wire
}

proptest! {
    #[test]
    fn prop_share_replays_byte_identical(
        region in "[a-z]{1,12}",
        payload in proptest::collection::btree_map("[a-z]{1,6}", proptest::collection::vec(-1e6f64..1e6, 0..4), 0..6),
    ) {
        let first = encode_share(&region, &payload);
        let second = encode_share(&region, &payload);
        prop_assert_eq!(&first, &second);

        let mut reader = first.as_slice();
        let tag = tokio_test::block_on(read_message_type(&mut reader)).unwrap();
        prop_assert_eq!(tag, MessageType::DcopShare);
        let (decoded_region, decoded): (RegionIdentifier, Payload) =
            tokio_test::block_on(ShareMessage::read_body(&mut reader, DEFAULT_MAX_FIELD_SIZE)).unwrap();
        prop_assert_eq!(decoded_region.as_str(), region.as_str());
        prop_assert_eq!(decoded, payload);
        prop_assert!(reader.is_empty());
    }

    #[test]
    fn prop_non_positive_length_always_loses_sync(
        length in i32::MIN..=0,
        trailing in proptest::collection::vec(any::<u8>(), 0..32),
    ) {
        let mut bytes = length.to_be_bytes().to_vec();
        bytes.extend(trailing);
        let mut reader = bytes.as_slice();
        let err = tokio_test::block_on(read_field(&mut reader, DEFAULT_MAX_FIELD_SIZE, "data")).unwrap_err();
        prop_assert!(err.is_sync_lost());
    }
}

#[tokio::test]
async fn test_messages_over_loopback() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let writer = tokio::spawn(async move {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        HelloMessage::new(42, NodeIdentifier::new("a1"))
            .write_to(&mut stream)
            .await
            .unwrap();
        ShareMessage::encode(RegionIdentifier::new("A"), &vec![1u32, 2, 3])
            .unwrap()
            .write_to(&mut stream)
            .await
            .unwrap();
        write_close(&mut stream).await.unwrap();
        stream.shutdown().await.unwrap();
    });

    let (mut stream, _) = listener.accept().await.unwrap();

    assert_eq!(read_message_type(&mut stream).await.unwrap(), MessageType::Hello);
    let hello = HelloMessage::read_body(&mut stream, DEFAULT_MAX_FIELD_SIZE).await.unwrap();
    assert_eq!(hello, HelloMessage::new(42, NodeIdentifier::new("a1")));

    assert_eq!(read_message_type(&mut stream).await.unwrap(), MessageType::DcopShare);
    let (region, numbers): (RegionIdentifier, Vec<u32>) =
        ShareMessage::read_body(&mut stream, DEFAULT_MAX_FIELD_SIZE).await.unwrap();
    assert_eq!(region, RegionIdentifier::new("A"));
    assert_eq!(numbers, vec![1, 2, 3]);

    assert_eq!(read_message_type(&mut stream).await.unwrap(), MessageType::Close);
    let eof = read_message_type(&mut stream).await.unwrap_err();
    assert!(matches!(eof, ProtocolError::Io { .. }));
    assert!(eof.is_eof());

    writer.await.unwrap();
}
