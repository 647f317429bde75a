use daily_checkin::cookies::{CookieJar, SessionStore, StoredCookie};
use std::collections::HashSet;
use url::Url;

fn cookie(name: &str, value: &str, domain: &str) -> StoredCookie {
    StoredCookie {
        name: name.into(),
        value: value.into(),
        domain: domain.into(),
        path: "/".into(),
        host_only: false,
        secure: false,
        expires_at: None,
    }
}

fn pairs(jar: &CookieJar) -> HashSet<(String, String)> {
    jar.snapshot()
        .into_iter()
        .map(|c| (c.name, c.value))
        .collect()
}

#[test]
fn save_then_load_keeps_name_value_pairs() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("data").join("cookies.json"));

    let jar = CookieJar::new();
    jar.insert(cookie("pt_key", "AAJ", "jd.com"));
    jar.insert(cookie("pt_pin", "user", "jd.com"));
    jar.insert(cookie("skey", "@xyz", "qq.com"));
    store.save(&jar).unwrap();

    let loaded = store.load();
    assert_eq!(pairs(&loaded), pairs(&jar));
    assert_eq!(
        loaded.value_for(&Url::parse("https://graph.qq.com/").unwrap(), "skey"),
        Some("@xyz".into())
    );
}

#[test]
fn missing_file_gives_empty_jar() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("cookies.json"));
    assert!(store.load().is_empty());
}

#[test]
fn corrupt_file_gives_empty_jar() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cookies.json");
    std::fs::write(&path, b"\x80\x03not json").unwrap();
    assert!(SessionStore::new(&path).load().is_empty());
}

#[test]
fn expired_cookies_are_not_saved() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("cookies.json"));

    let jar = CookieJar::from_cookies(vec![
        StoredCookie {
            expires_at: Some(1),
            ..cookie("old", "1", "jd.com")
        },
        cookie("fresh", "2", "jd.com"),
    ]);
    store.save(&jar).unwrap();

    let names: Vec<String> = store.load().snapshot().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["fresh".to_string()]);
}

#[test]
fn later_cookie_replaces_same_slot() {
    let jar = CookieJar::new();
    jar.insert(cookie("sid", "1", "jd.com"));
    jar.insert(cookie("sid", "2", "jd.com"));
    assert_eq!(jar.len(), 1);
    assert_eq!(
        jar.value_for(&Url::parse("https://bk.jd.com/m").unwrap(), "sid"),
        Some("2".into())
    );
}
