//! Property tests for rendezvous derivation, the handshake and sealing.

use proptest::prelude::*;
use tokio::time::Instant;

use trustdiary_core::{RendezvousId, TrustRecord, PAIRWISE_ID_LEN, SERVICE_ID_LEN};
use trustdiary_sync::{AuthOutcome, AuthSession, PeerId, SessionState};
use trustdiary_testkit::generators::{
    challenge, distinct_identities, identity, permission_set, plaintext, salt,
};
use trustdiary_trust::Sealed;

proptest! {
    #[test]
    fn rendezvous_is_the_same_from_both_sides((a, b) in distinct_identities()) {
        let from_a = RendezvousId::pairwise(&a.sign_public_key(), &b.sign_public_key());
        let from_b = RendezvousId::pairwise(&b.sign_public_key(), &a.sign_public_key());

        prop_assert_eq!(&from_a, &from_b);
        prop_assert_eq!(from_a.as_str().len(), PAIRWISE_ID_LEN);
    }

    #[test]
    fn service_rendezvous_depends_on_salt_and_key(
        holder in identity(),
        salt_a in salt(),
        salt_b in salt(),
    ) {
        let a = RendezvousId::service(&salt_a, &holder.sign_public_key());
        prop_assert_eq!(a.as_str().len(), SERVICE_ID_LEN);
        prop_assert_eq!(&a, &RendezvousId::service(&salt_a, &holder.sign_public_key()));

        if salt_a != salt_b {
            prop_assert_ne!(a, RendezvousId::service(&salt_b, &holder.sign_public_key()));
        }
    }

    #[test]
    fn signatures_bind_key_and_challenge(
        (signer, other) in distinct_identities(),
        c1 in challenge(),
        c2 in challenge(),
    ) {
        let signature = signer.sign(c1.as_bytes());

        prop_assert!(signer.sign_public_key().verify(c1.as_bytes(), &signature).is_ok());
        prop_assert!(other.sign_public_key().verify(c1.as_bytes(), &signature).is_err());
        if c1 != c2 {
            prop_assert!(signer.sign_public_key().verify(c2.as_bytes(), &signature).is_err());
        }
    }

    #[test]
    fn consumed_challenge_never_transitions(
        reader in identity(),
        permissions in permission_set(),
        first_signs_nonce in any::<bool>(),
    ) {
        let record = TrustRecord::new(
            reader.sign_public_key(),
            reader.enc_public_key(),
            "reader",
            permissions,
        );
        let mut session = AuthSession::new(PeerId::random());
        let nonce = session.issue_challenge(Instant::now()).unwrap();
        let good = reader.sign(nonce.as_bytes());
        let bad = reader.sign(b"something else");

        let first = if first_signs_nonce { good } else { bad };
        session.verify_response(&reader.sign_public_key(), &first, |_| Some(record.clone()));
        let settled = session.state();
        prop_assert!(matches!(settled, SessionState::Authenticated | SessionState::Rejected));

        let replay =
            session.verify_response(&reader.sign_public_key(), &good, |_| Some(record.clone()));
        prop_assert!(matches!(replay, AuthOutcome::Ignored(_)));
        prop_assert_eq!(session.state(), settled);
    }

    #[test]
    fn sealed_entries_open_only_for_their_recipient(
        holder in identity(),
        (recipient, outsider) in distinct_identities(),
        message in plaintext(512),
    ) {
        let sealed = Sealed::seal(
            holder.encryption_secret(),
            &recipient.enc_public_key(),
            &message,
        ).unwrap();

        let opened = sealed.open(recipient.encryption_secret(), &holder.enc_public_key()).unwrap();
        prop_assert_eq!(opened, message);

        if outsider.enc_public_key() != recipient.enc_public_key() {
            let opened = sealed.open(outsider.encryption_secret(), &holder.enc_public_key());
            prop_assert!(opened.is_err());
        }
    }

    #[test]
    fn sealing_twice_never_reuses_a_nonce(
        holder in identity(),
        recipient in identity(),
        message in plaintext(64),
    ) {
        let to = recipient.enc_public_key();
        let a = Sealed::seal(holder.encryption_secret(), &to, &message).unwrap();
        let b = Sealed::seal(holder.encryption_secret(), &to, &message).unwrap();

        prop_assert_ne!(a.nonce, b.nonce);
        prop_assert_ne!(a.ciphertext, b.ciphertext);
    }
}
