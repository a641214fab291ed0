//! `connector init`: write a sample connector configuration.

use clap::Args;
use std::path::PathBuf;

pub const CONFIG_FILE: &str = "connector.toml";

pub const SAMPLE_CONFIG: &str = r#"# Connector Configuration

[routing]
backend = "static"
spread = "0"
reflect_payments = true
quote_expiry_ms = 45000
min_message_window_ms = 1000
max_hold_time_ms = 30000

[logging]
level = "info"
format = "text"

[[accounts]]
id = "test.alice"
asset_code = "USD"
asset_scale = 2

[[accounts]]
id = "test.bob"
asset_code = "EUR"
asset_scale = 2

[[routes]]
prefix = "test.alice"
next_hop = "test.alice"

[[routes]]
prefix = "test.bob"
next_hop = "test.bob"

# Destinations past bob, priced by the curve bob advertises below.
[[routes]]
prefix = "test.carol"
next_hop = "test.bob"

[rates]
USD = "1"
EUR = "0.9"

[[remote_curves]]
next_hop = "test.bob"
prefix = "test.carol"
points = [["0", "0"], ["1000000", "990000"]]
min_message_window_ms = 1000
ttl_ms = 45000
"#;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (defaults to current directory).
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

pub fn run(args: &InitArgs) -> anyhow::Result<()> {
    let config_path = args.dir.join(CONFIG_FILE);

    if config_path.exists() {
        anyhow::bail!("configuration file already exists at {}", config_path.display());
    }

    std::fs::create_dir_all(&args.dir)?;
    std::fs::write(&config_path, SAMPLE_CONFIG)?;

    println!("Initialized connector config at {}", config_path.display());
    println!("Try: connector --config {} quote-source --from test.alice --to test.bob.x --amount 100", config_path.display());

    Ok(())
}
