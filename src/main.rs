use anyhow::{Context, Result};
use clap::{App, Arg};
use colored::*;
use rusty_jwt_fuzz::config::FuzzerConfig;
use rusty_jwt_fuzz::fuzzers::context::{CancellationFlag, ServerSideAttack};
use rusty_jwt_fuzz::fuzzers::header::KeyReferences;
use rusty_jwt_fuzz::fuzzers::{default_fuzzers, fuzz_parameter};
use rusty_jwt_fuzz::helpers::print_output::print_output;
use rusty_jwt_fuzz::host::{HttpScanHost, HttpTarget, TokenPlacement};
use rusty_jwt_fuzz::jwt_core::secret_cracker::SecretCracker;
use rusty_jwt_fuzz::jwt_core::trust_store::TrustStore;
use rusty_jwt_fuzz::jwt_core::utils::AlgorithmFamily;
use rusty_jwt_fuzz::types::{JwtToken, ScanReport};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = App::new("JWT Attack Fuzzer")
        .version("1.0")
        .author("Connor Fancy")
        .about("Replays forged JWTs against an endpoint and reports the ones it accepts")
        .arg(
            Arg::with_name("token")
                .help("A JWT the target currently accepts")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("url")
                .help("Endpoint that validates the token")
                .short("u")
                .long("url")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("method")
                .help("HTTP method of the replayed request")
                .short("X")
                .long("method")
                .takes_value(true)
                .default_value("GET"),
        )
        .arg(
            Arg::with_name("header")
                .help("Request header carrying the token")
                .long("header")
                .takes_value(true)
                .default_value("Authorization"),
        )
        .arg(
            Arg::with_name("prefix")
                .help("Text placed before the token in the header value")
                .long("prefix")
                .takes_value(true)
                .default_value("Bearer "),
        )
        .arg(
            Arg::with_name("query")
                .help("Send the token in this query parameter instead of a header")
                .long("query")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("config")
                .help("TOML configuration file")
                .short("c")
                .long("config")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("trust-store")
                .help("PEM bundle of certificates for algorithm confusion")
                .long("trust-store")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("format")
                .help("The output format of the report (text, json)")
                .short("f")
                .long("format")
                .takes_value(true)
                .possible_values(&["text", "json"])
                .default_value("text"),
        )
        .arg(
            Arg::with_name("timeout")
                .help("Request timeout in seconds")
                .long("timeout")
                .takes_value(true)
                .default_value("10"),
        )
        .arg(
            Arg::with_name("verbose")
                .help("Log every attempt")
                .short("v")
                .long("verbose"),
        )
        .get_matches();

    let level = if matches.is_present("verbose") {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let token_value = matches.value_of("token").unwrap_or_default().to_string();
    let url = matches.value_of("url").unwrap_or_default().to_string();
    let format = matches.value_of("format").unwrap_or("text").to_string();
    let timeout: u64 = matches
        .value_of("timeout")
        .unwrap_or("10")
        .parse()
        .context("--timeout must be a number of seconds")?;

    let config = match matches.value_of("config") {
        Some(path) => FuzzerConfig::load(path).with_context(|| format!("Loading config {}", path))?,
        None => FuzzerConfig::default(),
    };

    let token = JwtToken::parse(&token_value).context("The token is not a compact JWS")?;
    info!("Token uses algorithm '{}'", token.algorithm());

    let discovered_secret = discover_secret(&config, &token).await?;

    let trust_store_path = matches
        .value_of("trust-store")
        .map(PathBuf::from)
        .or_else(|| config.trust_store_path.clone());
    let trust_store = match trust_store_path {
        Some(path) => {
            let store = TrustStore::load(&path)
                .with_context(|| format!("Loading trust store {}", path.display()))?;
            info!("Loaded {} trusted certificate(s)", store.certificates().len());
            Some(Arc::new(store))
        }
        None => None,
    };

    let placement = match matches.value_of("query") {
        Some(name) => TokenPlacement::Query {
            name: name.to_string(),
        },
        None => TokenPlacement::Header {
            name: matches.value_of("header").unwrap_or("Authorization").to_string(),
            prefix: matches.value_of("prefix").unwrap_or_default().to_string(),
        },
    };
    let parameter = placement.parameter().to_string();
    let target = HttpTarget {
        url: url.clone(),
        method: matches.value_of("method").unwrap_or("GET").to_string(),
        placement,
    };

    let host = HttpScanHost::connect(target, &token_value, Duration::from_secs(timeout))
        .await
        .with_context(|| format!("Capturing baselines from {}", url))?;

    let cancellation = CancellationFlag::new();
    let stop = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current request");
            stop.cancel();
        }
    });

    let context = ServerSideAttack::new(
        &host,
        url.as_str(),
        parameter.as_str(),
        token_value.as_str(),
        cancellation,
    )?;
    let fuzzers = default_fuzzers(&config, trust_store, discovered_secret.clone());

    println!("Fuzzing JWT on {}...", url.bold());
    let successful_fuzzer = fuzz_parameter(&fuzzers, &context).await;

    let report = ScanReport {
        target: url,
        parameter,
        algorithm: token.algorithm().to_string(),
        discovered_secret,
        successful_fuzzer: successful_fuzzer.map(String::from),
        key_references: KeyReferences::from_token(&token).unwrap_or_default(),
        findings: host.findings(),
    };
    print_output(&format, &report);

    Ok(())
}

/// Dictionary attack on HMAC tokens before any request is sent.
async fn discover_secret(config: &FuzzerConfig, token: &JwtToken) -> Result<Option<String>> {
    let is_hmac = token
        .jws_algorithm()
        .map_or(false, |alg| alg.family() == AlgorithmFamily::Hmac);
    if !is_hmac {
        return Ok(None);
    }

    let mut cracker = SecretCracker::new(config.hmac_max_key_length);
    if let Some(wordlist) = &config.secret_wordlist {
        cracker = cracker
            .with_wordlist(wordlist)
            .with_context(|| format!("Reading wordlist {}", wordlist.display()))?;
    }
    info!("Trying {} candidate secret(s)", cracker.candidate_count());

    let token = token.clone();
    let secret = tokio::task::spawn_blocking(move || cracker.crack(&token)).await??;
    match &secret {
        Some(secret) => println!("{} Found matching secret: {}", "[!]".green(), secret.green()),
        None => println!("{} Could not crack signature with common secrets", "[-]".yellow()),
    }
    Ok(secret)
}
