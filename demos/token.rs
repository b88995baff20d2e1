//! Sign, verify and decode JWTs from the command line.
//!
//! Loads `.env` automatically if present, otherwise reads from the environment.
//! Keys come from the files named by `JWT_PRIVATE_KEY_PATH` and
//! `JWT_PUBLIC_KEY_PATH`.
//!
//! ```bash
//! cargo run --example token -- sign '{"payload":{"sub":"user-1","exp":"365d"}}'
//! cargo run --example token -- verify eyJhbG...
//! cargo run --example token -- decode eyJhbG...
//! ```

use jwt_timeclaims::{decode, Jwt, JwtConfig, JwtError, SignOptions, VerifyOptions};
use tracing_subscriber::EnvFilter;

fn main() {
    // Load .env if present; silently ignore if absent.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        usage();
    }

    let result = match args[0].as_str() {
        "sign" => run_sign(&args[1]),
        "verify" => run_verify(&args[1]),
        "decode" => run_decode(&args[1]),
        _ => usage(),
    };

    if let Err(e) = result {
        eprintln!("Failed: {e}");
        std::process::exit(1);
    }
}

fn jwt() -> Result<Jwt, JwtError> {
    Ok(Jwt::new(JwtConfig::from_env()?))
}

fn read_key(var: &str) -> Result<String, JwtError> {
    let path = std::env::var(var).map_err(|_| JwtError::Config(format!("{var} is not set")))?;
    std::fs::read_to_string(&path)
        .map_err(|e| JwtError::Config(format!("cannot read {var}={path}: {e}")))
}

fn run_sign(options_json: &str) -> Result<(), JwtError> {
    let mut options: SignOptions = serde_json::from_str(options_json)
        .map_err(|e| JwtError::Config(format!("options are not valid JSON: {e}")))?;
    if options.private_key.is_none() {
        options.private_key = Some(read_key("JWT_PRIVATE_KEY_PATH")?.into());
    }
    println!("{}", jwt()?.sign(&options)?);
    Ok(())
}

fn run_verify(token: &str) -> Result<(), JwtError> {
    let key = read_key("JWT_PUBLIC_KEY_PATH")?;
    let claims = jwt()?.verify_claims(&VerifyOptions::new(token, key))?;
    println!("Valid\n");
    print_json(&claims);
    Ok(())
}

fn run_decode(token: &str) -> Result<(), JwtError> {
    let decoded = decode(token).ok_or(JwtError::Decode)?;
    println!("header:");
    print_json(&decoded.header);
    println!("payload:");
    print_json(&decoded.payload);
    Ok(())
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("cannot render: {e}"),
    }
}

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  cargo run --example token -- sign   '<json options>'");
    eprintln!("  cargo run --example token -- verify <token>");
    eprintln!("  cargo run --example token -- decode <token>");
    std::process::exit(1);
}
