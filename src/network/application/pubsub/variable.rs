//! Clamped and smoothed numeric channel variables.
//!
//! A [`Variable`] mirrors one numeric key on a channel: inbound events
//! update the local value, [`Variable::set`] publishes it. Values can be
//! clamped to a range and smoothed over a sliding window with an optional
//! sigma bound on jumps. Everything is layered on the public
//! publish/subscribe surface; the variable carries no protocol state.

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use core::cell::RefCell;

use rand_core::RngCore;
use serde_json::Value;

use super::client::Client;
use super::{ClientError, Payload};
use crate::network::Connection;
use crate::time::Clock;

#[cfg(feature = "async")]
use super::client::AsyncClient;
#[cfg(feature = "async")]
use crate::network::AsyncConnection;

#[derive(Debug, Default)]
struct VarState {
    value: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    sigma: Option<f64>,
    window: usize,
    values: VecDeque<f64>,
}

impl VarState {
    /// The observable value: the window mean while smoothing, the last
    /// value otherwise.
    fn current(&self) -> Option<f64> {
        if self.window > 0 && !self.values.is_empty() {
            Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
        } else {
            self.value
        }
    }

    /// Clamp a raw value to the configured range; failing that, pull a jump
    /// beyond sigma back toward the window mean.
    fn constrain(&self, raw: f64) -> f64 {
        if let Some(min) = self.min {
            if raw < min {
                return min;
            }
        }
        if let Some(max) = self.max {
            if raw > max {
                return max;
            }
        }
        if let Some(sigma) = self.sigma {
            if let Some(mean) = self.current() {
                if (mean - raw).abs() > sigma {
                    let weight = self.values.len().max(1) as f64;
                    return if mean - raw > 0.0 {
                        mean - sigma / weight
                    } else {
                        mean + sigma / weight
                    };
                }
            }
        }
        raw
    }

    fn absorb(&mut self, raw: f64) {
        let constrained = self.constrain(raw);
        if self.window > 0 {
            self.values.push_back(constrained);
            while self.values.len() > self.window {
                self.values.pop_front();
            }
        } else {
            self.value = Some(constrained);
        }
    }
}

/// A numeric value mirrored over a channel under a fixed key.
///
/// Created with [`Variable::subscribe`], which wires an internal callback
/// into the client's subscription registry; the variable and the callback
/// share state, so the value updates whenever the host pumps the client.
/// Configuration chains: `Variable::subscribe(..)?.min(0.0).smooth(5, None)`.
#[derive(Debug)]
pub struct Variable {
    channel: String,
    key: String,
    state: Rc<RefCell<VarState>>,
}

impl Variable {
    /// Subscribe a variable to `key` on `channel`.
    pub fn subscribe<C, R, K>(
        client: &mut Client<C, R, K>,
        channel: &str,
        key: &str,
    ) -> Result<Self, ClientError>
    where
        C: Connection,
        R: RngCore,
        K: Clock,
    {
        let state = Rc::new(RefCell::new(VarState::default()));
        let shared = Rc::clone(&state);
        let watched = key.to_string();
        client.subscribe(channel, move |_: &str, _: &str, event: &Payload| {
            if let Some(value) = event.get(&watched).and_then(Value::as_f64) {
                shared.borrow_mut().absorb(value);
            }
        })?;
        Ok(Self {
            channel: channel.to_string(),
            key: key.to_string(),
            state,
        })
    }

    /// Subscribe a variable through an async client.
    #[cfg(feature = "async")]
    pub async fn subscribe_async<C, R, K>(
        client: &mut AsyncClient<C, R, K>,
        channel: &str,
        key: &str,
    ) -> Result<Self, ClientError>
    where
        C: AsyncConnection,
        R: RngCore,
        K: Clock,
    {
        let state = Rc::new(RefCell::new(VarState::default()));
        let shared = Rc::clone(&state);
        let watched = key.to_string();
        client
            .subscribe(channel, move |_: &str, _: &str, event: &Payload| {
                if let Some(value) = event.get(&watched).and_then(Value::as_f64) {
                    shared.borrow_mut().absorb(value);
                }
            })
            .await?;
        Ok(Self {
            channel: channel.to_string(),
            key: key.to_string(),
            state,
        })
    }

    /// Lower bound for incoming and outgoing values. A current value below
    /// the new bound is pulled up to it.
    pub fn min(self, min: f64) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.min = Some(min);
            if let Some(value) = state.value {
                if value < min {
                    state.value = Some(min);
                }
            }
        }
        self
    }

    /// Upper bound for incoming and outgoing values. A current value above
    /// the new bound is pulled down to it.
    pub fn max(self, max: f64) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.max = Some(max);
            if let Some(value) = state.value {
                if value > max {
                    state.value = Some(max);
                }
            }
        }
        self
    }

    /// Smooth over a sliding window of `window` samples. With `sigma` set,
    /// a sample further than sigma from the window mean is pulled back
    /// toward it instead of taken as-is.
    pub fn smooth(self, window: usize, sigma: Option<f64>) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.window = window;
            state.sigma = sigma;
        }
        self
    }

    /// The current value: the window mean while smoothing, the last
    /// value otherwise. `None` until a value was seen or set.
    ///
    /// The value only advances while the host pumps the owning client.
    pub fn get(&self) -> Option<f64> {
        self.state.borrow().current()
    }

    /// Record a value locally (clamped and smoothed) and publish the raw
    /// value under the variable's key.
    pub fn set<C, R, K>(
        &mut self,
        client: &mut Client<C, R, K>,
        value: f64,
    ) -> Result<(), ClientError>
    where
        C: Connection,
        R: RngCore,
        K: Clock,
    {
        self.state.borrow_mut().absorb(value);
        client.publish(&self.channel, &self.outgoing(value))
    }

    /// Async twin of [`Variable::set`].
    #[cfg(feature = "async")]
    pub async fn set_async<C, R, K>(
        &mut self,
        client: &mut AsyncClient<C, R, K>,
        value: f64,
    ) -> Result<(), ClientError>
    where
        C: AsyncConnection,
        R: RngCore,
        K: Clock,
    {
        self.state.borrow_mut().absorb(value);
        client.publish(&self.channel, &self.outgoing(value)).await
    }

    /// The channel this variable lives on.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The payload key this variable tracks.
    pub fn key(&self) -> &str {
        &self.key
    }

    fn outgoing(&self, value: f64) -> Payload {
        let mut payload = Payload::new();
        payload.insert(self.key.clone(), Value::from(value));
        payload
    }
}
