use pinub::{Db, Error, RequestContext};
use tempfile::TempDir;

fn setup_db() -> (TempDir, Db) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db = Db::open(dir.path().join("pinub.db")).expect("Failed to open db");
    (dir, db)
}

/// Row count straight from sqlite, bypassing the crate.
fn count(db : &Db, sql : &str) -> i64 {
    let conn = rusqlite::Connection::open(db.path()).unwrap();
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn register_save_list_remove() {
    let (_dir, db) = setup_db();

    let h = db.handle().unwrap();
    h.register("a@b.com", "pass1", "pass1").await.unwrap();
    let token = h.sign_in("a@b.com", "pass1").await.unwrap();

    let ctx = RequestContext::begin(&db, Some(&token)).await.unwrap();
    let (link_id, _) = ctx.save_link("http://example.com/x", &[]).await.unwrap();
    ctx.finish().await;

    let ctx = RequestContext::begin(&db, Some(&token)).await.unwrap();
    let links = ctx.links().await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].url, "http://example.com/x");
    assert_eq!(links[0].id, link_id);

    ctx.remove_link(link_id).await.unwrap();
    assert!(ctx.links().await.unwrap().is_empty());
    ctx.finish().await;

    assert_eq!(count(&db, "SELECT count(*) FROM links"), 0);
    assert_eq!(count(&db, "SELECT count(*) FROM user_links"), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_registration_keeps_one_row() {
    let (_dir, db) = setup_db();
    let h = db.handle().unwrap();

    h.register("a@b.com", "pass1", "pass1").await.unwrap();
    let err = h.register("a@b.com", "other", "other").await.unwrap_err();

    assert!(matches!(err, Error::DuplicateEmail(_)));
    assert_eq!(count(&db, "SELECT count(*) FROM users"), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn link_lives_while_anyone_holds_it() {
    let (_dir, db) = setup_db();
    let h = db.handle().unwrap();

    let mut users = Vec::new();
    for i in 0..4 {
        users.push(h.create_user(&format!("u{}@b.com", i), "hash").await.unwrap());
    }

    let mut link_ids = Vec::new();
    for &user in &users {
        let (link_id, _) = h.save_url(user, "example.com/shared").await.unwrap();
        link_ids.push(link_id);
    }
    link_ids.dedup();
    assert_eq!(link_ids.len(), 1);
    let link_id = link_ids[0];

    for &user in &users[..3] {
        h.remove_link(link_id, user).await.unwrap();
        assert!(h.get_link(link_id).await.is_ok());
    }
    assert_eq!(count(&db, "SELECT count(*) FROM user_links"), 1);

    h.remove_link(link_id, users[3]).await.unwrap();
    assert_eq!(count(&db, "SELECT count(*) FROM links"), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_find_or_create_makes_one_row() {
    let (_dir, db) = setup_db();

    let tasks = (0..8)
        .map(|_| {
            let handle = db.handle().unwrap();
            tokio::spawn(async move {
                handle.find_or_create_link("http://x.com").await
            })
        })
        .collect::<Vec<_>>();

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap().unwrap());
    }

    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(count(&db, "SELECT count(*) FROM links WHERE url = 'http://x.com/'"), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_save_and_remove_never_lose_a_save() {
    let (_dir, db) = setup_db();
    let h = db.handle().unwrap();

    let saver = h.create_user("saver@b.com", "hash").await.unwrap();
    let remover = h.create_user("remover@b.com", "hash").await.unwrap();

    for round in 0..20 {
        let url = format!("example.com/{}", round);
        let (link_id, _) = h.save_url(remover, &url).await.unwrap();

        let save = {
            let handle = db.handle().unwrap();
            tokio::spawn(async move { handle.save_url(saver, &url).await })
        };
        let remove = {
            let handle = db.handle().unwrap();
            tokio::spawn(async move { handle.remove_link(link_id, remover).await })
        };

        let (saved_id, _) = save.await.unwrap().unwrap();
        remove.await.unwrap().unwrap();

        let link = h.get_link(saved_id).await.unwrap();
        assert!(link.url.ends_with(&format!("/{}", round)));
        assert_eq!(h.list_links(saver).await.unwrap()[0].id, saved_id);
    }

    assert_eq!(count(&db, "SELECT count(*) FROM links"), 20);
}

#[tokio::test(flavor = "multi_thread")]
async fn sign_out_then_resolve() {
    let (_dir, db) = setup_db();
    let token = db
        .handle()
        .unwrap()
        .register("a@b.com", "pass1", "pass1")
        .await
        .unwrap();

    let mut ctx = RequestContext::begin(&db, Some(&token)).await.unwrap();
    assert!(ctx.user().is_some());
    ctx.sign_out().await.unwrap();
    ctx.finish().await;

    let h = db.handle().unwrap();
    assert!(h.resolve_token(&token).await.unwrap().is_none());
    h.revoke_token(&token).await.unwrap();
}
