use netsim_protocol::{bits, CheckAlgorithm, Frame, MacAddr};
use proptest::prelude::*;

#[test]
fn simple_hash_is_the_byte_padded_popcount() {
    // Five ones: check is the single byte 0b0000_0101.
    let payload = [1u8, 0, 1, 1, 0, 0, 1, 1];
    let check = CheckAlgorithm::SimpleHash.encode(&payload);
    assert_eq!(bits::to_int(&check.size), 1);
    assert_eq!(check.bits, bits::from_int(5, 8));
}

#[test]
fn simple_hash_of_an_empty_payload_is_one_zero_byte() {
    let check = CheckAlgorithm::SimpleHash.encode(&[]);
    assert_eq!(bits::to_int(&check.size), 1);
    assert_eq!(check.bits, vec![0u8; 8]);
}

#[test]
fn simple_hash_grows_past_one_byte_when_the_sum_does() {
    // 256 ones force a 9-bit sum, padded to two bytes.
    let payload = vec![1u8; 256];
    let check = CheckAlgorithm::SimpleHash.encode(&payload);
    assert_eq!(bits::to_int(&check.size), 2);
    assert_eq!(check.bits, bits::from_int(256, 16));
}

#[test]
fn hamming_detects_a_single_flipped_bit() {
    let payload = bits::from_hex("DEADBEEF").unwrap();
    let check = CheckAlgorithm::Hamming.encode(&payload);
    assert!(CheckAlgorithm::Hamming.verify(&payload, &check.bits));

    for i in 0..payload.len() {
        let mut corrupted = payload.clone();
        corrupted[i] ^= 1;
        assert!(
            !CheckAlgorithm::Hamming.verify(&corrupted, &check.bits),
            "flip of payload bit {i} went undetected"
        );
    }
}

#[test]
fn simple_hash_detects_a_zeroed_one() {
    let payload = bits::from_hex("AB").unwrap();
    let check = CheckAlgorithm::SimpleHash.encode(&payload);

    let mut corrupted = payload.clone();
    let one = corrupted.iter().position(|&b| b == 1).unwrap();
    corrupted[one] = 0;
    assert!(!CheckAlgorithm::SimpleHash.verify(&corrupted, &check.bits));
}

#[test]
fn corrupt_frames_fail_verification() {
    let payload = bits::from_hex("C0FFEE").unwrap();
    for alg in [CheckAlgorithm::SimpleHash, CheckAlgorithm::Hamming] {
        let frame = Frame::build(MacAddr(2), MacAddr(1), &payload, &alg);
        let mut raw = frame.bits().to_vec();
        // Flip a payload bit in place on the wire image.
        raw[48] ^= 1;
        let reparsed = Frame::parse(&raw).unwrap();
        assert!(!reparsed.verify(&alg), "{alg} missed the corruption");
    }
}

#[test]
fn algorithm_names_parse_and_reject() {
    assert_eq!("simple_hash".parse(), Ok(CheckAlgorithm::SimpleHash));
    assert_eq!("hamming".parse(), Ok(CheckAlgorithm::Hamming));
    assert!("crc32".parse::<CheckAlgorithm>().is_err());
    assert!("Hamming".parse::<CheckAlgorithm>().is_err());
}

proptest! {
    #[test]
    fn encode_then_verify_always_holds(
        payload in proptest::collection::vec(0u8..=1, 0..256),
    ) {
        for alg in [CheckAlgorithm::SimpleHash, CheckAlgorithm::Hamming] {
            let check = alg.encode(&payload);
            prop_assert!(alg.verify(&payload, &check.bits));
            prop_assert_eq!(check.bits.len() % 8, 0);
            prop_assert_eq!(bits::to_int(&check.size) as usize, check.bits.len() / 8);
        }
    }
}
