//! Salt generation command.

use anyhow::Result;
use clap::Args;
use rand::rngs::OsRng;
use rand::RngCore;

use super::CommandExecutor;

/// Number of random bytes in a generated salt.
const SALT_BYTES: usize = 32;

/// Print a random salt suitable for `SALT_MASTER`.
///
/// Every client of a room must use the same value.
#[derive(Args, Debug)]
pub struct GenSaltCommand {
    /// Print only the value, without the export line
    #[arg(short, long)]
    pub quiet: bool,
}

impl CommandExecutor for GenSaltCommand {
    fn execute(&self) -> Result<()> {
        let salt = generate_salt();
        if self.quiet {
            println!("{}", salt);
        } else {
            println!("export SALT_MASTER={}", salt);
        }
        Ok(())
    }
}

fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pakechat::config::Salt;

    #[test]
    fn test_generated_salt_is_usable() {
        let salt = generate_salt();
        assert_eq!(salt.len(), SALT_BYTES * 2);
        assert!(salt.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(Salt::from_config_str(&salt).is_ok());
        assert_ne!(salt, generate_salt());
    }
}
