//! Proptest generators for property-based testing.

use proptest::prelude::*;

use trustdiary_core::{
    DiaryEntry, Ed25519PublicKey, Identity, Keypair, NewEntry, Permission, PermissionSet,
};
use trustdiary_sync::ChallengeNonce;

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random Ed25519PublicKey.
pub fn public_key() -> impl Strategy<Value = Ed25519PublicKey> {
    keypair().prop_map(|kp| kp.public_key())
}

/// Generate a full identity.
pub fn identity() -> impl Strategy<Value = Identity> {
    (any::<[u8; 32]>(), any::<[u8; 32]>())
        .prop_map(|(sign_seed, enc_secret)| Identity::from_seeds(sign_seed, enc_secret))
}

/// Generate two identities with different signing keys.
pub fn distinct_identities() -> impl Strategy<Value = (Identity, Identity)> {
    (identity(), identity())
        .prop_filter("distinct signing keys", |(a, b)| {
            a.sign_public_key() != b.sign_public_key()
        })
}

/// Generate a challenge nonce.
pub fn challenge() -> impl Strategy<Value = ChallengeNonce> {
    any::<[u8; 32]>().prop_map(ChallengeNonce)
}

/// Generate a rendezvous salt.
pub fn salt() -> impl Strategy<Value = String> {
    "[a-z0-9-]{0,24}".prop_map(String::from)
}

/// Generate a permission set, possibly empty.
pub fn permission_set() -> impl Strategy<Value = PermissionSet> {
    prop::collection::btree_set(
        prop_oneof![
            Just(Permission::Read),
            Just(Permission::Write),
            Just(Permission::Admin),
        ],
        0..=3,
    )
    .prop_map(|set| set.into_iter().collect())
}

/// Generate plaintext bytes of specified max length.
pub fn plaintext(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate the user-supplied part of an entry.
pub fn new_entry() -> impl Strategy<Value = NewEntry> {
    (".{0,40}", ".{0,200}", prop::option::of("[a-z]{1,12}")).prop_map(
        |(title, content, mood)| {
            let entry = NewEntry::new(content).title(title);
            match mood {
                Some(mood) => entry.mood(mood),
                None => entry,
            }
        },
    )
}

/// Generate a complete, unsigned entry.
pub fn diary_entry() -> impl Strategy<Value = DiaryEntry> {
    (new_entry(), 1u64..10_000, "[A-Za-z ]{1,16}", 0i64..=i64::MAX / 2)
        .prop_map(|(new, id, author, created_at)| new.into_entry(id, author, created_at))
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_entries_sign_and_verify(entry in diary_entry(), kp in keypair()) {
            let signed = entry.sign(&kp).unwrap();
            prop_assert!(signed.verify(&kp.public_key()).is_ok());
        }

        #[test]
        fn generated_permission_sets_round_trip_csv(set in permission_set()) {
            prop_assert_eq!(PermissionSet::from_csv(&set.to_csv()).unwrap(), set);
        }
    }
}
