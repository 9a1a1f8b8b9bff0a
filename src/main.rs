//!
//! odoo-cli
//! --------
//! Command-line access to an Odoo server over XML-RPC. Connection settings come from
//! flags or the ODOO_* environment variables; domains, record data and method arguments
//! are given as JSON.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing::info;

use odoo_client::cli::render_records;
use odoo_client::config::{ENV_AUTH_TIMEOUT_SECS, ENV_DB, ENV_PASSWORD, ENV_SKIP_TLS_VERIFY, ENV_URL, ENV_USERNAME};
use odoo_client::logging::{self, LoggerEnv};
use odoo_client::{CallContext, ClientConfig, Data, Domain, Fields, Model, OdooClient, Options};

#[derive(Parser, Debug)]
#[command(name = "odoo-cli", version, about = "Query and modify Odoo records over XML-RPC")]
struct Cli {
    #[arg(long, env = ENV_URL)]
    url: String,
    #[arg(long, env = ENV_DB)]
    db: String,
    #[arg(long, env = ENV_USERNAME)]
    user: String,
    #[arg(long, env = ENV_PASSWORD, hide_env_values = true)]
    password: String,
    /// Accept invalid TLS certificates (development only)
    #[arg(long, env = ENV_SKIP_TLS_VERIFY)]
    skip_tls_verify: bool,
    /// Session lifetime before re-authenticating
    #[arg(long, env = ENV_AUTH_TIMEOUT_SECS, default_value_t = 6 * 60 * 60)]
    auth_timeout_secs: u64,
    /// Overall deadline for the command
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
    /// development | production
    #[arg(long, default_value = "development")]
    log_env: LoggerEnv,
    /// Print raw JSON instead of a table
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search ids matching a JSON domain, e.g. '[["is_company","=",true]]'
    Search {
        model: String,
        #[arg(default_value = "[]")]
        domain: String,
        #[arg(long, default_value_t = 0)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
        #[arg(long)]
        order: Option<String>,
        /// Also read these comma-separated fields
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },
    /// Read records by id
    Read {
        model: String,
        #[arg(required = true, value_delimiter = ',')]
        ids: Vec<i64>,
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },
    /// Create a record from a JSON object
    Create { model: String, data: String },
    /// Write a JSON object to records; or per-record data with --each '{"7": {...}}'
    Update {
        model: String,
        #[arg(long, value_delimiter = ',')]
        ids: Vec<i64>,
        #[arg(long)]
        data: Option<String>,
        #[arg(long)]
        each: Option<String>,
    },
    /// Delete records by id
    Delete {
        model: String,
        #[arg(required = true, value_delimiter = ',')]
        ids: Vec<i64>,
    },
    /// Call any model method with JSON positional args and keyword args
    Call {
        model: String,
        method: String,
        #[arg(default_value = "[]")]
        args: String,
        #[arg(long, default_value = "{}")]
        kwargs: String,
    },
}

fn parse_json(label: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text).with_context(|| format!("{} is not valid JSON", label))
}

fn print_value(v: &Value, raw_json: bool) -> Result<()> {
    if !raw_json {
        if let Some(table) = render_records(v) {
            println!("{}", table);
            return Ok(());
        }
    }
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = ClientConfig::new(&cli.url, &cli.db, &cli.user, &cli.password)?
        .with_skip_tls_verify(cli.skip_tls_verify)
        .with_auth_timeout(Duration::from_secs(cli.auth_timeout_secs))
        .with_request_timeout(Duration::from_secs(cli.timeout_secs));
    let client = OdooClient::new(config)?;
    let ctx = CallContext::with_timeout(Duration::from_secs(cli.timeout_secs));

    let uid = client.login(&ctx).await?;
    info!(target: "odoo::cli", uid, db = %cli.db, "logged in");

    let out: Value = match cli.command {
        Command::Search { model, domain, limit, offset, order, fields } => {
            let model = Model::from(model);
            let domain = Domain::from_json(&parse_json("domain", &domain)?)?;
            let mut opts = Options::new().limit(limit).offset(offset);
            if let Some(o) = order { opts = opts.order(o); }
            if fields.is_empty() {
                serde_json::to_value(client.search(&ctx, &model, &domain, Some(&opts)).await?)?
            } else {
                let fields = Fields::from(fields);
                Value::Array(client.search_read(&ctx, &model, &domain, &fields, Some(&opts)).await?.into_iter().map(Value::Object).collect())
            }
        }
        Command::Read { model, ids, fields } => {
            let records = client.read(&ctx, &Model::from(model), &ids, &Fields::from(fields), None).await?;
            Value::Array(records.into_iter().map(Value::Object).collect())
        }
        Command::Create { model, data } => {
            let data = Data::from_json(parse_json("data", &data)?)?;
            Value::from(client.create_one(&ctx, &Model::from(model), &data, None).await?)
        }
        Command::Update { model, ids, data, each } => {
            let model = Model::from(model);
            match (data, each) {
                (Some(d), None) => {
                    let data = Data::from_json(parse_json("data", &d)?)?;
                    Value::Bool(client.update(&ctx, &model, &ids, &data, None).await?)
                }
                (None, Some(e)) => {
                    let parsed: BTreeMap<i64, Value> = serde_json::from_str(&e).context("--each must map record ids to JSON objects")?;
                    let mut updates = BTreeMap::new();
                    for (id, v) in parsed { updates.insert(id, Data::from_json(v)?); }
                    let failed = client.update_multiple(&ctx, &model, updates, None).await?;
                    let mut report = Map::new();
                    for (id, err) in failed { report.insert(id.to_string(), Value::String(err.to_string())); }
                    Value::Object(report)
                }
                _ => return Err(anyhow!("update needs exactly one of --data or --each")),
            }
        }
        Command::Delete { model, ids } => Value::Bool(client.delete(&ctx, &Model::from(model), &ids, None).await?),
        Command::Call { model, method, args, kwargs } => {
            let args = match parse_json("args", &args)? {
                Value::Array(a) => a,
                other => vec![other],
            };
            let kwargs = match parse_json("kwargs", &kwargs)? {
                Value::Object(m) => m,
                _ => return Err(anyhow!("kwargs must be a JSON object")),
            };
            client.call_odoo(&ctx, &Model::from(model), &method, args, kwargs).await?
        }
    };
    print_value(&out, cli.json)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_env);
    run(cli).await
}
