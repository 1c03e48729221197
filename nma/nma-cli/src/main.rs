#![deny(
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

//! nma-cli is a command line application based on NotifyMyAndroid API.
//!
//! If NotifyMyAndroid API key is "apikey",
//!
//! ```
//! $ nma-cli -k apikey -a backup -e done backup finished in 3 minutes
//! ```
//!
//! Or you can set environment variables instead, and pipe the description,
//!
//! ```
//! $ export NMA_API_KEY=apikey
//! $ echo "backup finished in 3 minutes" | nma-cli -a backup -e done
//! ```
//!
//! For more information,
//!
//! ```
//! $ nma-cli -h
//! ```

use std::str::FromStr;

use anyhow::bail;
use clap::Parser;
use log::{debug, Level};
use logging_timer::{finish, stimer};

use nma::{Client, ContentType, Notification, Priority, Success};

#[doc(hidden)]
#[derive(Debug, Parser)]
#[clap(about, author, version)]
struct Opts {
    /// Your API keys, separated with comma. All of them are notified.
    #[clap(short = 'k', long, env = "NMA_API_KEY", value_delimiter = ',', required = true)]
    apikey: Vec<String>,
    /// Developer key to identify your application.
    #[clap(long, env = "NMA_DEVELOPER_KEY")]
    developer_key: Option<String>,
    /// Send requests to another server e.g. http://localhost:8080
    #[clap(long, env = "NMA_SERVER")]
    server: Option<String>,
    /// The name of the application that is generating the call.
    #[clap(short, long, default_value = "")]
    application: String,
    /// The event that occurred e.g. "New e-mail".
    #[clap(short, long, default_value = "")]
    event: String,
    /// Priority e.g. -2, -1, 0, 1, 2, very-low, moderate, normal, high, emergency.
    #[clap(short, long, allow_hyphen_values = true)]
    priority: Option<String>,
    /// URL to open when the notification is tapped.
    #[clap(long)]
    url: Option<String>,
    /// Content type of the description e.g. html, text.
    #[clap(long)]
    content_type: Option<String>,
    /// Verify the first API key instead of sending a notification.
    #[clap(long)]
    verify: bool,
    /// Verbose.
    #[clap(short, long)]
    verbose: bool,
    /// Description of the event, read from standard input if omitted.
    description: Vec<String>,
}

#[doc(hidden)]
fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opts: Opts = Opts::parse();

    let mut keys = opts.apikey.iter().filter(|k| !k.is_empty());
    let primary = match keys.next() {
        Some(k) => k,
        None => bail!("at least one API key is required"),
    };

    let mut client = Client::new(primary);
    for k in keys {
        client.add_key(k);
    }
    if let Some(ref k) = opts.developer_key {
        client.set_developer_key(k);
    }
    if let Some(ref s) = opts.server {
        client = client.with_base_url(s);
    }

    let res = if opts.verify {
        let tmr = stimer!(Level::Debug; "VERIFY");
        let res = client.verify(primary)?;
        finish!(tmr);
        res
    } else {
        let description = read_description(&opts)?;
        let mut notification = Notification::new(
            opts.application.as_str(),
            opts.event.as_str(),
            description.as_str(),
        );
        if let Some(ref p) = opts.priority {
            notification.priority = Priority::from_str(p)?;
        }
        if let Some(ref c) = opts.content_type {
            notification.content_type = Some(ContentType::from_str(c)?);
        }
        notification.url = opts.url.as_deref();

        let tmr = stimer!(Level::Debug; "NOTIFY");
        let res = client.notify(&notification)?;
        finish!(tmr);
        res
    };

    if opts.verbose {
        print_quota(&res);
    }
    Ok(())
}

fn read_description(opts: &Opts) -> anyhow::Result<String> {
    use std::io::Read as _;

    if !opts.description.is_empty() {
        return Ok(opts.description.join(" "));
    }
    if atty::is(atty::Stream::Stdin) {
        return Ok(String::new());
    }
    debug!("read description from standard input");
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf.trim_end().to_string())
}

fn print_quota(res: &Success) {
    println!(
        "code={} remaining={} resettimer={}",
        res.code, res.remaining, res.reset_timer
    );
}
