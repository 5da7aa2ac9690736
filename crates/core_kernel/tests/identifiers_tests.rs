//! Bill id generation, display and parsing

use core_kernel::BillId;
use uuid::Uuid;

mod bill_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let id1 = BillId::new();
        let id2 = BillId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = BillId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = BillId::new_v7();
        let uuid1: Uuid = id1.into();
        let uuid2: Uuid = id2.into();
        assert!(uuid1 < uuid2);
    }

    #[test]
    fn test_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = BillId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn test_display_is_prefixed() {
        let id = BillId::from_uuid(Uuid::from_u128(1));
        assert_eq!(id.to_string(), "BILL-00000000-0000-0000-0000-000000000001");
    }

    #[test]
    fn test_from_str_with_prefix() {
        let original = BillId::new();
        let parsed: BillId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_from_str_without_prefix() {
        let uuid = Uuid::new_v4();
        let parsed: BillId = uuid.to_string().parse().unwrap();
        assert_eq!(*parsed.as_uuid(), uuid);
    }

    #[test]
    fn test_from_str_rejects_legacy_string_ids() {
        let result: Result<BillId, _> = "1700000000000-1-k3j2h1g0f".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_default_is_random() {
        assert_ne!(BillId::default(), BillId::default());
    }
}
