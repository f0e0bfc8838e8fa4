//! Wallet capability seam.
//!
//! The reconciler only ever asks "is a wallet connected, at what address,
//! with what balance". Everything behind that question sits behind
//! [`Wallet`] so the app runs the same against a simulated provider.

use anyhow::Result;
use nanoid::nanoid;
use rand::Rng;
use rand::rngs::StdRng;

pub trait Wallet {
    /// Establishes a connection; may fail (a real provider can be absent
    /// or the user can refuse).
    fn connect(&mut self) -> Result<()>;
    fn disconnect(&mut self);
    fn address(&self) -> Option<&str>;
    /// Native balance in ETH, known only while connected.
    fn balance_eth(&self) -> Option<f64>;
    fn is_connected(&self) -> bool {
        self.address().is_some()
    }
}

/// Self-contained stand-in for a browser wallet: derives a plausible
/// `0x…` address from a random id once at construction and reports a
/// small random balance while connected. Reconnecting yields the same
/// identity, the way a real provider would.
pub struct SimWallet {
    rng: StdRng,
    identity: String,
    connected: bool,
    balance: Option<f64>,
}

impl SimWallet {
    pub fn new(rng: StdRng) -> Self {
        let hash = blake3::hash(nanoid!().as_bytes());
        Self {
            rng,
            identity: format!("0x{}", &hash.to_hex()[..40]),
            connected: false,
            balance: None,
        }
    }
}

impl Wallet for SimWallet {
    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        self.balance = Some(self.rng.gen_range(0.05..0.75));
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.balance = None;
    }

    fn address(&self) -> Option<&str> {
        self.connected.then_some(self.identity.as_str())
    }

    fn balance_eth(&self) -> Option<f64> {
        self.balance
    }
}
