use pinub::*;

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    config.init_tracing();

    let args = std::env::args().collect::<Vec<_>>();

    match &args[..] {
        [_, db, email, password] => {
            if let Err(err) = add_user(db, email, password).await {
                eprintln!("error: {}", err);
                std::process::exit(1);
            }
        },
        _ => {
            eprintln!("usage: ./add_user db email password");
            std::process::exit(1);
        }
    }
}

async fn add_user(db : &str, email : &str, password : &str) -> Result<()> {
    let db = database::Db::open(db)?;
    let password_enc = crypto::encode_password(password.as_bytes())?;

    let user_id = db.handle()?.create_user(email, &password_enc).await?;
    println!("{}", user_id);

    Ok(())
}
