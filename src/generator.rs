// src/generator.rs
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::net::Ipv4Addr;

use crate::models::domain::{PacketEvent, Protocol};

pub const MIN_PACKET_SIZE: u32 = 64;
pub const MAX_PACKET_SIZE: u32 = 1564;

const TCP_SHARE: f64 = 0.7;
// Applied to the non-TCP remainder.
const UDP_SHARE_OF_REST: f64 = 0.9;

/// Anything that can produce the next packet for a publish tick.
pub trait EventSource {
    fn next_event(&mut self) -> PacketEvent;
}

/// Uniform synthetic traffic: weighted protocol draw, random dotted quads,
/// uniform sizes.
pub struct PacketGenerator<R: Rng> {
    rng: R,
}

impl PacketGenerator<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> PacketGenerator<R> {
    pub fn new(rng: R) -> Self {
        PacketGenerator { rng }
    }

    pub fn generate(&mut self) -> PacketEvent {
        self.generate_at(Utc::now().timestamp_millis())
    }

    pub fn generate_at(&mut self, timestamp: i64) -> PacketEvent {
        let protocol = self.draw_protocol();
        let source = self.random_ip();
        let destination = self.random_ip();
        let size = self.rng.gen_range(MIN_PACKET_SIZE..=MAX_PACKET_SIZE);

        PacketEvent {
            source,
            destination,
            protocol,
            size,
            timestamp,
        }
    }

    fn draw_protocol(&mut self) -> Protocol {
        if self.rng.gen_bool(TCP_SHARE) {
            Protocol::Tcp
        } else if self.rng.gen_bool(UDP_SHARE_OF_REST) {
            Protocol::Udp
        } else {
            Protocol::Icmp
        }
    }

    fn random_ip(&mut self) -> Ipv4Addr {
        Ipv4Addr::from(self.rng.gen::<[u8; 4]>())
    }
}

impl<R: Rng> EventSource for PacketGenerator<R> {
    fn next_event(&mut self) -> PacketEvent {
        self.generate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn sizes_stay_in_range() {
        let mut generator = PacketGenerator::seeded(7);
        for _ in 0..5_000 {
            let event = generator.generate();
            assert!((MIN_PACKET_SIZE..=MAX_PACKET_SIZE).contains(&event.size));
        }
    }

    #[test]
    fn protocol_mix_is_roughly_70_27_3() {
        let mut generator = PacketGenerator::seeded(42);
        let mut counts: HashMap<Protocol, u32> = HashMap::new();
        let draws = 20_000;
        for _ in 0..draws {
            *counts.entry(generator.generate_at(0).protocol).or_insert(0) += 1;
        }
        let share = |p: Protocol| counts.get(&p).copied().unwrap_or(0) as f64 / draws as f64;
        assert!((share(Protocol::Tcp) - 0.70).abs() < 0.02);
        assert!((share(Protocol::Udp) - 0.27).abs() < 0.02);
        assert!((share(Protocol::Icmp) - 0.03).abs() < 0.01);
    }

    #[test]
    fn same_seed_same_traffic() {
        let mut a = PacketGenerator::seeded(99);
        let mut b = PacketGenerator::seeded(99);
        for _ in 0..10 {
            assert_eq!(a.generate_at(5), b.generate_at(5));
        }
    }

    #[test]
    fn timestamp_is_epoch_millis() {
        let before = Utc::now().timestamp_millis();
        let event = PacketGenerator::seeded(1).generate();
        let after = Utc::now().timestamp_millis();
        assert!(event.timestamp >= before && event.timestamp <= after);
    }
}
