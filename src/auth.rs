use anyhow::{Result, bail};
use std::io::{self, IsTerminal};
use zeroize::Zeroizing;

pub const PASSPHRASE_ENV: &str = "VAULTSEAL_PASSPHRASE";

/// Reads the master passphrase from the environment, piped stdin, or a
/// terminal prompt, in that order.
pub fn read_passphrase() -> Result<Zeroizing<String>> {
    //  VAULTSEAL_PASSPHRASE="master" vaultseal decrypt <token>
    if let Ok(pw) = std::env::var(PASSPHRASE_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    //  printf "%s" "$MASTER" | vaultseal encrypt hunter2
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_line(&mut buf)?;
        let pw = Zeroizing::new(buf.trim_end_matches(['\r', '\n']).to_string());

        if !pw.is_empty() {
            return Ok(pw);
        }
    }

    if io::stdin().is_terminal() {
        let pw = Zeroizing::new(rpassword::prompt_password("Master passphrase: ")?);
        if !pw.is_empty() {
            return Ok(pw);
        }
    }

    bail!("no passphrase provided")
}
