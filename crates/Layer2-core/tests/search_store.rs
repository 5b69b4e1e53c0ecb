//! Compiled searches executed against a real SQLite event store
//!
//! `cargo test -p trail-search --test search_store`

use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use trail_foundation::{
    Error, EventRecord, EventStore, Identity, IdentityAttribute, IdentityDirectory, JsonStore,
    ParsePolicy, Result, SearchConfig, SqlFilter, SEARCH_CONFIG_FILE,
};
use trail_search::{CompiledSearch, FieldRegistry, SearchCompiler};

struct Fixture {
    store: Arc<EventStore>,
    compiler: SearchCompiler,
    /// 2024-01-15 00:00:00, alice, post, low, "Hello World", site 2, modified
    e1: i64,
    /// 2024-01-15 23:59:59, bob, post, no severity, "Draft notes", created
    e2: i64,
    /// 2024-01-16 00:00:00, no actor, user, high
    e3: i64,
    /// 2024-01-14 23:59:59, carol, no object, "Another hello"
    e4: i64,
    /// 2024-01-15 12:00:00, actor id 7 under a different login
    e5: i64,
    /// 2024-02-01 09:30:00, login "alice" under a different id
    e6: i64,
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

fn fixture() -> Fixture {
    let store = Arc::new(EventStore::in_memory().expect("open store"));

    for identity in [
        Identity::new(7, "alice")
            .with_name("Alice", "Smith")
            .with_email("alice@example.com")
            .with_roles(["editor"]),
        Identity::new(8, "bob")
            .with_name("Bob", "Jones")
            .with_email("bob@example.com")
            .with_roles(["author"]),
        Identity::new(9, "carol")
            .with_name("Carol", "Smith")
            .with_email("carol@example.com")
            .with_roles(["administrator"]),
    ] {
        store.insert_identity(&identity).unwrap();
    }

    let insert = |event: EventRecord| store.insert_event(&event).unwrap();

    let e1 = insert(
        EventRecord::new(2001, at(2024, 1, 15, 0, 0, 0))
            .with_object("post")
            .with_severity("low")
            .with_actor(7, "alice")
            .with_roles(["editor"])
            .with_site(2)
            .with_event_type("modified")
            .with_client_ip("10.0.0.1")
            .with_user_agent("Mozilla/5.0")
            .with_session("a1b2")
            .with_meta("PostTitle", "Hello World")
            .with_meta("PostStatus", "publish"),
    );
    let e2 = insert(
        EventRecord::new(2002, at(2024, 1, 15, 23, 59, 59))
            .with_object("post")
            .with_actor(8, "bob")
            .with_roles(["author"])
            .with_event_type("created")
            .with_client_ip("10.0.0.2")
            .with_session("c3d4")
            .with_meta("PostTitle", "Draft notes")
            .with_meta("PostStatus", "draft"),
    );
    let e3 = insert(
        EventRecord::new(1000, at(2024, 1, 16, 0, 0, 0))
            .with_object("user")
            .with_severity("high"),
    );
    let e4 = insert(
        EventRecord::new(2001, at(2024, 1, 14, 23, 59, 59))
            .with_actor(9, "carol")
            .with_roles(["administrator"])
            .with_meta("PostTitle", "Another hello"),
    );
    let e5 = insert(
        EventRecord::new(2001, at(2024, 1, 15, 12, 0, 0))
            .with_object("post")
            .with_actor(7, "alice_old")
            .with_roles(["editor", "author"]),
    );
    let e6 = insert(
        EventRecord::new(3000, at(2024, 2, 1, 9, 30, 0))
            .with_object("plugin")
            .with_actor(70, "alice"),
    );

    let registry = Arc::new(FieldRegistry::standard().unwrap());
    let compiler = SearchCompiler::new(registry, store.clone(), store.clone());

    Fixture {
        store,
        compiler,
        e1,
        e2,
        e3,
        e4,
        e5,
        e6,
    }
}

impl Fixture {
    fn all(&self) -> BTreeSet<i64> {
        [self.e1, self.e2, self.e3, self.e4, self.e5, self.e6].into()
    }

    fn search(&self, query: &str) -> BTreeSet<i64> {
        self.search_with(&self.compiler, query)
    }

    fn search_with(&self, compiler: &SearchCompiler, query: &str) -> BTreeSet<i64> {
        let filter = compiler
            .compile(query)
            .unwrap()
            .to_sql()
            .expect("query should compile to a filter");
        self.store
            .find_events(&filter)
            .unwrap()
            .into_iter()
            .map(|event| event.id)
            .collect()
    }
}

fn ids<const N: usize>(ids: [i64; N]) -> BTreeSet<i64> {
    ids.into()
}

// ============================================================================
// Ordering and grouping
// ============================================================================

#[test]
fn test_permutation_equivalence() {
    let f = fixture();
    let queries = [
        "object:post -severity:low alert_code:2001",
        "alert_code:2001 object:post -severity:low",
        "-severity:low alert_code:2001 object:post",
    ];
    let expected = ids([f.e5]);
    for query in queries {
        assert_eq!(f.search(query), expected, "{}", query);
    }
}

#[test]
fn test_inclusion_and_exclusion_independent() {
    let f = fixture();
    assert!(f.search("object:post -object:post").is_empty());
    assert_eq!(f.search("object:post object:user -object:post"), ids([f.e3]));
    assert_eq!(f.search("object:post object:user"), ids([f.e1, f.e2, f.e3, f.e5]));
}

#[test]
fn test_exclusion_keeps_null_columns() {
    let f = fixture();
    assert_eq!(f.search("-severity:low"), ids([f.e2, f.e3, f.e4, f.e5, f.e6]));

    let without_object = f.search("-object:post");
    assert!(without_object.contains(&f.e4));
    assert_eq!(without_object, ids([f.e3, f.e4, f.e6]));
}

#[test]
fn test_unknown_field_is_noop() {
    let f = fixture();
    assert_eq!(f.search("object:post colour:red"), f.search("object:post"));
    assert_eq!(f.search("colour:red"), f.all());
}

#[test]
fn test_direct_columns() {
    let f = fixture();
    assert_eq!(f.search("site_id:2"), ids([f.e1]));
    assert_eq!(f.search("event_type:modified event_type:created"), ids([f.e1, f.e2]));
    assert_eq!(f.search("-event_type:modified"), ids([f.e2, f.e3, f.e4, f.e5, f.e6]));
    assert_eq!(f.search("client_ip:10.0.0.2"), ids([f.e2]));
    assert_eq!(f.search("session_id:a1b2 -client_ip:10.0.0.1"), ids([]));
    assert_eq!(f.search("user_agent:Mozilla/5.0"), ids([f.e1]));
}

#[test]
fn test_passthrough_has_no_filter() {
    let f = fixture();
    let compiled = f.compiler.compile("hello world").unwrap();
    assert!(compiled.is_passthrough());
    assert_eq!(compiled, CompiledSearch::Passthrough("hello world".into()));
    assert!(compiled.to_sql().is_none());
}

// ============================================================================
// Date range
// ============================================================================

#[test]
fn test_date_range_boundaries() {
    let f = fixture();
    assert_eq!(
        f.search("start_date:2024-01-15 end_date:2024-01-15"),
        ids([f.e1, f.e2, f.e5])
    );
    assert_eq!(f.search("start_date:2024-01-16"), ids([f.e3, f.e6]));
    assert_eq!(f.search("end_date:2024-01-14"), ids([f.e4]));
}

#[test]
fn test_date_range_uses_configured_offset() {
    let f = fixture();
    let compiler = SearchCompiler::new(
        Arc::new(FieldRegistry::standard().unwrap()),
        f.store.clone(),
        f.store.clone(),
    )
    .with_config(SearchConfig::new().with_utc_offset_minutes(60))
    .unwrap();

    // Local 2024-01-15 at UTC+1 is 2024-01-14 23:00:00 .. 2024-01-15 22:59:59 UTC
    assert_eq!(
        f.search_with(&compiler, "start_date:2024-01-15 end_date:2024-01-15"),
        ids([f.e1, f.e4, f.e5])
    );
}

#[test]
fn test_invalid_date_rejected_by_default() {
    let f = fixture();
    let err = f.compiler.compile("start_date:15/01/2024").unwrap_err();
    assert!(matches!(err, Error::InvalidDate { ref field, .. } if field == "start_date"));
    assert!(err.is_user_facing());
}

// ============================================================================
// Metadata fields
// ============================================================================

#[test]
fn test_meta_field_substring_match() {
    let f = fixture();
    assert_eq!(f.search("post_title:hello"), ids([f.e1, f.e4]));
    assert_eq!(f.search("post_title:HELLO"), ids([f.e1, f.e4]));
    assert_eq!(f.search("post_name:hello"), f.search("post_title:hello"));
    assert!(f.search("post_title:missing").is_empty());
}

#[test]
fn test_meta_field_matches_beyond_bind_limit() {
    let store = Arc::new(EventStore::in_memory().unwrap());
    let created = at(2024, 3, 1, 0, 0, 0);
    for _ in 0..33_000 {
        store
            .insert_event(&EventRecord::new(2001, created).with_meta("PostTitle", "Hello"))
            .unwrap();
    }
    store
        .insert_event(&EventRecord::new(2001, created).with_meta("PostTitle", "Other"))
        .unwrap();

    let compiler = SearchCompiler::new(
        Arc::new(FieldRegistry::standard().unwrap()),
        store.clone(),
        store.clone(),
    );
    let filter = compiler.compile("post_title:hello").unwrap().to_sql().unwrap();
    assert!(filter.params.is_empty());
    assert_eq!(store.find_events(&filter).unwrap().len(), 33_000);

    let filter = compiler.compile("-post_title:hello").unwrap().to_sql().unwrap();
    assert_eq!(store.find_events(&filter).unwrap().len(), 1);
}

#[test]
fn test_meta_field_exclusion() {
    let f = fixture();
    assert_eq!(
        f.search("-post_title:draft"),
        ids([f.e1, f.e3, f.e4, f.e5, f.e6])
    );
    assert_eq!(f.search("post_title:hello -post_status:publish"), ids([f.e4]));
}

// ============================================================================
// Identity fields
// ============================================================================

#[test]
fn test_role_inclusion_or_exclusion_and() {
    let f = fixture();
    assert_eq!(
        f.search("user_role:editor user_role:author"),
        ids([f.e1, f.e2, f.e5])
    );
    assert_eq!(
        f.search("-user_role:editor -user_role:author"),
        ids([f.e3, f.e4, f.e6])
    );
    assert_eq!(f.search("user_role:editor -user_role:author"), ids([f.e1]));
}

#[test]
fn test_role_with_separator_matches_nothing() {
    let f = fixture();
    assert!(f.search("user_role:editor,author").is_empty());
    assert_eq!(f.search("-user_role:editor,author"), f.all());
    assert_eq!(
        f.search("user_role:editor,author user_role:author"),
        ids([f.e2, f.e5])
    );

    let events = f.store.find_events(&SqlFilter::always()).unwrap();
    for query in [
        "user_role:editor,author",
        "-user_role:editor,author",
        "user_role:,editor",
        "user_role:editor -user_role:author,",
    ] {
        let compiled = f.compiler.compile(query).unwrap();
        let predicate = compiled.predicate().unwrap();
        let in_memory: BTreeSet<i64> = events
            .iter()
            .filter(|event| predicate.matches(event))
            .map(|event| event.id)
            .collect();
        assert_eq!(f.search(query), in_memory, "{}", query);
    }
}

#[test]
fn test_identity_inclusion_or_across_aliases() {
    let f = fixture();
    // e5 matches on actor_id only, e6 on actor_login only
    assert_eq!(
        f.search("user_email:alice@example.com"),
        ids([f.e1, f.e5, f.e6])
    );
}

#[test]
fn test_identity_exclusion_and_across_aliases() {
    let f = fixture();
    assert_eq!(
        f.search("-user_email:alice@example.com"),
        ids([f.e2, f.e3, f.e4])
    );
}

#[test]
fn test_identity_lookup_by_name_and_id() {
    let f = fixture();
    assert_eq!(
        f.search("user_last_name:smith"),
        ids([f.e1, f.e4, f.e5, f.e6])
    );
    assert_eq!(f.search("user_id:8"), ids([f.e2]));
    assert!(f.search("user_first_name:nobody").is_empty());
}

// ============================================================================
// Collaborator failures and policy
// ============================================================================

struct Unreachable;

impl IdentityDirectory for Unreachable {
    fn name(&self) -> &str {
        "network"
    }

    fn find_identities(&self, _: IdentityAttribute, _: &[String]) -> Result<Vec<Identity>> {
        Err(Error::Storage("connection reset".into()))
    }
}

#[test]
fn test_lookup_failure_aborts_compilation() {
    let f = fixture();
    let compiler = SearchCompiler::new(
        Arc::new(FieldRegistry::standard().unwrap()),
        f.store.clone(),
        f.store.clone(),
    )
    .with_federated(Arc::new(Unreachable));

    let err = compiler.compile("user_email:alice@example.com").unwrap_err();
    assert!(matches!(err, Error::LookupFailed { ref source_name, .. } if source_name == "network"));
    assert!(err.is_retryable());

    // Fields that need no identity lookup are unaffected
    assert!(compiler.compile("user_role:editor").is_ok());
}

#[test]
fn test_federated_identities_are_merged() {
    struct Network;

    impl IdentityDirectory for Network {
        fn name(&self) -> &str {
            "network"
        }

        fn find_identities(
            &self,
            attribute: IdentityAttribute,
            values: &[String],
        ) -> Result<Vec<Identity>> {
            let remote = Identity::new(8, "bob").with_email("alice@example.com");
            Ok(if attribute == IdentityAttribute::Email
                && values.iter().any(|v| v == "alice@example.com")
            {
                vec![remote]
            } else {
                vec![]
            })
        }
    }

    let f = fixture();
    let compiler = SearchCompiler::new(
        Arc::new(FieldRegistry::standard().unwrap()),
        f.store.clone(),
        f.store.clone(),
    )
    .with_federated(Arc::new(Network));

    assert_eq!(
        f.search_with(&compiler, "user_email:alice@example.com"),
        ids([f.e1, f.e2, f.e5, f.e6])
    );
}

#[test]
fn test_strict_and_lenient_policies() {
    let f = fixture();
    let build = |policy: ParsePolicy| {
        SearchCompiler::new(
            Arc::new(FieldRegistry::standard().unwrap()),
            f.store.clone(),
            f.store.clone(),
        )
        .with_policy(policy)
    };

    let strict = build(ParsePolicy::strict());
    assert!(matches!(
        strict.compile("colour:red object:post"),
        Err(Error::UnknownField(_))
    ));

    let lenient = build(ParsePolicy::lenient());
    assert_eq!(
        f.search_with(&lenient, "start_date:someday object:user"),
        ids([f.e3])
    );
}

#[test]
fn test_config_loaded_from_json_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = serde_json::json!({
        "version": 1,
        "utcOffsetMinutes": -300,
        "unknownFields": "fail"
    });
    std::fs::write(
        dir.path().join(SEARCH_CONFIG_FILE),
        serde_json::to_string_pretty(&config).unwrap(),
    )
    .unwrap();

    let config = SearchConfig::load_from(&JsonStore::new(dir.path())).unwrap();
    let f = fixture();
    let compiler = SearchCompiler::new(
        Arc::new(FieldRegistry::standard().unwrap()),
        f.store.clone(),
        f.store.clone(),
    )
    .with_config(config)
    .unwrap();

    assert_eq!(compiler.policy(), ParsePolicy::strict());
    // Local 2024-01-14 at UTC-5 ends at 2024-01-15 04:59:59 UTC
    assert_eq!(
        f.search_with(&compiler, "start_date:2024-01-14 end_date:2024-01-14"),
        ids([f.e1, f.e4])
    );
}
