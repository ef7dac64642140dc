use rand::Rng;

/// Supplies handshake nonces
pub trait NonceSource: Send + Sync {
    fn next_nonce(&self) -> u32;
}

/// Uniformly random nonces from the thread-local generator
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomNonces;

impl NonceSource for RandomNonces {
    fn next_nonce(&self) -> u32 {
        rand::thread_rng().gen()
    }
}

impl<F> NonceSource for F
where
    F: Fn() -> u32 + Send + Sync,
{
    fn next_nonce(&self) -> u32 {
        self()
    }
}
