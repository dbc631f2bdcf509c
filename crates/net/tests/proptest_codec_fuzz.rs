//! Fuzz-style property tests for the frame codec
//!
//! These tests validate that the envelope decoder handles arbitrary
//! network input gracefully without crashing, and that the verification
//! pass rejects over-limit payloads.

use proptest::prelude::*;
use tileforge_net::{
    decode_envelope, encode_envelope, Envelope, NetError, NetMessage, FRAME_HEADER_LEN,
    MAX_CHAT_LEN,
};
use tileforge_sim::Facing;

fn world_change(x: i32, y: i32, block: u8) -> Envelope {
    Envelope::new("host", NetMessage::WorldChange { x, y, block })
}

proptest! {
    /// Property: Arbitrary bytes don't crash the decoder
    #[test]
    fn arbitrary_bytes_dont_crash(
        random_bytes in prop::collection::vec(any::<u8>(), 0..2000),
    ) {
        let _result = decode_envelope(&random_bytes);
        // No panic = success
    }

    /// Property: Player transforms roundtrip
    #[test]
    fn player_move_roundtrips(
        x in -1000.0f32..1000.0,
        y in -1000.0f32..1000.0,
        vx in -2.0f32..2.0,
        vy in -2.0f32..2.0,
        left in any::<bool>(),
    ) {
        let env = Envelope::new("joiner-1", NetMessage::PlayerMove {
            x,
            y,
            vx,
            vy,
            facing: if left { Facing::Left } else { Facing::Right },
            held_item: None,
            anim_timer: 3.5,
        });
        let decoded = decode_envelope(&encode_envelope(&env).unwrap()).unwrap();
        prop_assert_eq!(env, decoded);
    }

    /// Property: Truncated frames are rejected, never half-decoded
    #[test]
    fn truncated_frames_rejected(
        x in any::<i32>(),
        y in any::<i32>(),
        truncate_at in 0usize..20,
    ) {
        let mut encoded = encode_envelope(&world_change(x, y, 2)).unwrap();
        if truncate_at < encoded.len() {
            encoded.truncate(truncate_at);
            prop_assert!(decode_envelope(&encoded).is_err());
        }
    }

    /// Property: Oversized length prefix handled
    #[test]
    fn oversized_length_handled(
        claimed_length in 100u32..5000u32,
    ) {
        let mut frame = Vec::new();
        frame.extend_from_slice(&claimed_length.to_le_bytes());
        frame.push(3);
        frame.extend_from_slice(&[0, 1, 2, 3, 4]);

        prop_assert!(matches!(decode_envelope(&frame), Err(NetError::Codec(_))));
    }

    /// Property: Corrupted payload handled
    #[test]
    fn corrupted_payload_handled(
        flip_pos in 0usize..30,
        flip_bit in 0u8..8,
    ) {
        let mut encoded = encode_envelope(&world_change(12, 40, 1)).unwrap();
        if flip_pos + FRAME_HEADER_LEN < encoded.len() {
            encoded[flip_pos + FRAME_HEADER_LEN] ^= 1 << flip_bit;
            let _result = decode_envelope(&encoded);
            // May succeed or fail - just shouldn't panic
        }
    }

    /// Property: Chat text past the limit never survives decoding
    #[test]
    fn long_chat_rejected(extra in 1usize..64) {
        let env = Envelope::new("host", NetMessage::Chat {
            text: "z".repeat(MAX_CHAT_LEN + extra),
            author: "host".into(),
            color: 0x00ff00,
        });
        let encoded = encode_envelope(&env).unwrap();
        prop_assert!(decode_envelope(&encoded).is_err());
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn empty_frame_fails() {
        assert!(decode_envelope(&[]).is_err());
    }

    #[test]
    fn too_short_fails() {
        assert!(decode_envelope(&[1, 2, 3]).is_err());
    }

    #[test]
    fn valid_roundtrip() {
        let env = Envelope::new(
            "host",
            NetMessage::EnemySync {
                enemies: Vec::new(),
            },
        );
        let decoded = decode_envelope(&encode_envelope(&env).unwrap()).unwrap();
        assert_eq!(env, decoded);
    }
}
