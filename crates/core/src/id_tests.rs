use super::*;

#[test]
fn display_matches_inner_string() {
    let id = JobId::new("job-123");
    assert_eq!(id.to_string(), "job-123");
    assert_eq!(id.as_str(), "job-123");
}

#[test]
fn compares_equal_to_str() {
    let id = UserId::new("u1");
    assert_eq!(id, "u1");
    assert_eq!(id, *"u1".to_string());
}

#[test]
fn from_string_and_str() {
    let a: JobId = "j1".into();
    let b: JobId = "j1".to_string().into();
    assert_eq!(a, b);
}

#[test]
fn usable_as_hashmap_key_by_borrow() {
    use std::collections::HashMap;
    let mut map: HashMap<JobId, u32> = HashMap::new();
    map.insert(JobId::new("j1"), 1);
    assert_eq!(map.get("j1"), Some(&1));
}
