//! Domain-separated random streams derived from a single user seed.
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use sha2::Sha256;

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

/// Independent streams so that, e.g., buying a random backdrop never
/// shifts which items later monsters drop.
#[derive(Debug, Clone)]
pub struct RngBundle {
    drop: CountingRng<SmallRng>,
    bonus: CountingRng<SmallRng>,
    item: CountingRng<SmallRng>,
    shop: CountingRng<SmallRng>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            drop: CountingRng::new(derive_stream_seed(seed, b"drop")),
            bonus: CountingRng::new(derive_stream_seed(seed, b"bonus")),
            item: CountingRng::new(derive_stream_seed(seed, b"item")),
            shop: CountingRng::new(derive_stream_seed(seed, b"shop")),
        }
    }

    /// Stream deciding whether a defeated monster drops anything.
    pub const fn drops(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.drop
    }

    /// Stream deciding final-boss bonus drops.
    pub const fn bonus(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.bonus
    }

    /// Stream picking rarity tiers and items.
    pub const fn item(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.item
    }

    /// Stream for shop side effects.
    pub const fn shop(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.shop
    }
}

/// Derive a stream seed from the user seed and a domain tag.
#[must_use]
pub fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
