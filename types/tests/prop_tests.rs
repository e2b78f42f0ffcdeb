use proptest::prelude::*;

use caves_types::{AccountId, DaoId, DaoRef, Role, RoleKind};

proptest! {
    /// DaoId key bytes roundtrip and preserve numeric order.
    #[test]
    fn dao_id_be_bytes_order(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ia = DaoId::new(a);
        let ib = DaoId::new(b);
        prop_assert_eq!(DaoId::from_be_bytes(ia.to_be_bytes()), ia);
        prop_assert_eq!(ia.to_be_bytes() < ib.to_be_bytes(), a < b);
    }

    /// `#<n>` always parses back to the same id.
    #[test]
    fn dao_ref_id_parse(n in 0u64..u64::MAX) {
        let parsed: DaoRef = format!("#{n}").parse().unwrap();
        prop_assert_eq!(parsed, DaoRef::Id(DaoId::new(n)));
    }

    /// Names without a leading `#` parse as names.
    #[test]
    fn dao_ref_name_parse(name in "[A-Za-z][A-Za-z0-9 ]{0,20}") {
        let parsed: DaoRef = name.parse().unwrap();
        prop_assert_eq!(parsed, DaoRef::Name(name));
    }

    /// Account ids survive bincode serialization.
    #[test]
    fn account_id_bincode(raw in "0x[0-9a-f]{1,40}") {
        let id = AccountId::parse(&raw).unwrap();
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: AccountId = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, id);
    }

    /// A board member of any stake satisfies both requirements and reports its stake.
    #[test]
    fn board_role_stake(stake in 0u64..u64::MAX) {
        let role = Role::BoardMember { stake };
        prop_assert_eq!(role.stake(), stake);
        prop_assert!(role.satisfies(RoleKind::Member));
        prop_assert!(role.satisfies(RoleKind::BoardMember));
    }
}
