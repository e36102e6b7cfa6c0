use json_store::DocumentRepository;
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), json_store::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let root = std::env::temp_dir().join("json_store_demo");
    let db = DocumentRepository::builder(&root).pretty(true).build();
    let users = db.store("users")?;

    // writes land in memory right away; one flush covers the whole burst
    users.set("alice", json!({ "age": 30 }));
    users.set("bob", json!({ "age": 25 }));
    println!("alice  = {:?}", users.get("alice"));
    println!("has bob? {}", users.has("bob"));

    users.update(|doc| {
        let mut next = doc.clone();
        next.insert("count".into(), json!(doc.len()));
        next
    });
    users.delete("bob");
    println!("keys   = {:?}", users.keys());

    let adults = users.select(|doc| {
        doc.values()
            .filter(|u| u["age"].as_u64().is_some_and(|age| age >= 18))
            .count()
    });
    println!("adults = {adults}");

    // persist the state after the burst, not just its leading edge
    users.flush()?;
    users.close()?;
    println!("saved to {}", db.resolve_path("users").display());

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}
