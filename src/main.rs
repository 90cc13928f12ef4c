use pinub::models::{LinkId, Time};
use pinub::{crypto, time_utils, Config, Db, RequestContext, Result};

const USAGE : &str = "usage: pinub <command>

commands:
    initdb                      create the database schema
    hash <password>             print the password hash
    register <email> <password> create an account, print its token
    signin <email> <password>   print a new token
    signout <token>             revoke the token
    save <token> <url>          save a link
    links <token>               list saved links as json
    remove <token> <id,id,...>  remove links";

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    config.init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let args = args.iter().map(String::as_str).collect::<Vec<_>>();

    if let Err(err) = run(&config, &args).await {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

async fn run(config : &Config, args : &[&str]) -> Result<()> {
    match args {
        ["initdb"] => {
            Db::open(&config.dsn)?;
            println!("Initialized the database.");
        },
        ["hash", password] => {
            println!("{}", crypto::encode_password(password.as_bytes())?);
        },
        ["register", email, password] => {
            let db = Db::open(&config.dsn)?;
            let token = db.handle()?.register(email, password, password).await?;
            println!("{}", token);
        },
        ["signin", email, password] => {
            let db = Db::open(&config.dsn)?;
            println!("{}", db.handle()?.sign_in(email, password).await?);
        },
        ["signout", token] => {
            let mut ctx = signed_in(config, token).await?;
            ctx.sign_out().await?;
        },
        ["save", token, url] => {
            let ctx = signed_in(config, token).await?;
            let (link_id, _) = ctx.save_link(url, &[]).await?;
            println!("{}", link_id);
            ctx.finish().await;
        },
        ["links", token] => {
            let ctx = signed_in(config, token).await?;
            print_links(&ctx).await?;
            ctx.finish().await;
        },
        ["remove", token, ids] => {
            let ctx = signed_in(config, token).await?;
            let out = ctx.apply_pending_deletes(Some(*ids)).await?;
            for (link_id, err) in &out.failed {
                eprintln!("could not remove {}: {}", link_id, err);
            }
            ctx.finish().await;
        },
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        },
    }

    Ok(())
}

async fn signed_in(config : &Config, token : &str) -> Result<RequestContext> {
    let db = Db::open(&config.dsn)?;
    let ctx = RequestContext::begin(&db, Some(token)).await?;
    ctx.require_user()?;

    Ok(ctx)
}

async fn print_links(ctx : &RequestContext) -> Result<()> {
    #[derive(serde::Serialize)]
    struct Entry<'a> {
        id :    LinkId,
        url :   &'a str,
        saved : &'a Time,
        age :   String,
    }

    let now = time::OffsetDateTime::now_utc();
    let links = ctx.links().await?;
    let entries = links
        .iter()
        .map(|link| Entry {
            id :    link.id,
            url :   &link.url,
            saved : &link.saved_at,
            age :   time_utils::time_since(&link.saved_at, now),
        })
        .collect::<Vec<_>>();

    println!("{}", serde_json::to_string_pretty(&entries)?);

    Ok(())
}
