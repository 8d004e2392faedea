#[cfg(test)]
mod tests {
    use crate::api::{BroadcastId, ClassroomId, StudentId, UserId};
    use uuid::Uuid;

    #[test]
    fn test_user_id_new() {
        let raw = Uuid::new_v4();
        let id = UserId::new(raw);
        assert_eq!(id.value(), raw);
    }

    #[test]
    fn test_user_id_equality() {
        let raw = Uuid::new_v4();
        let id1 = UserId::new(raw);
        let id2 = UserId::from(raw);
        let id3 = UserId::random();

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_ids_parse_from_str() {
        let id: ClassroomId = "0c22f1f1-9184-4fd4-9b21-28c68a6a89dc".parse().unwrap();
        assert_eq!(id.to_string(), "0c22f1f1-9184-4fd4-9b21-28c68a6a89dc");
    }

    #[test]
    fn test_ids_parse_trims_whitespace() {
        let id: StudentId = "  d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2 ".parse().unwrap();
        assert_eq!(Uuid::from(id).to_string(), "d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2");
    }

    #[test]
    fn test_ids_reject_garbage() {
        assert!("not-a-uuid".parse::<BroadcastId>().is_err());
        assert!("".parse::<UserId>().is_err());
    }
}
