//! RPC subscription mode selection.

/// How a chain adapter discovers new logs and blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionMode {
	/// `eth_subscribe`-style push subscriptions over WebSocket.
	WebSocket,
	/// Periodic polling over HTTP.
	HttpPolling,
}

impl SubscriptionMode {
	/// Selects the mode from the RPC URL scheme: `ws://` and `wss://`
	/// use WebSocket subscriptions, everything else polls.
	pub fn from_rpc_url(rpc_url: &str) -> Self {
		if rpc_url.starts_with("wss://") || rpc_url.starts_with("ws://") {
			SubscriptionMode::WebSocket
		} else {
			SubscriptionMode::HttpPolling
		}
	}
}

impl std::fmt::Display for SubscriptionMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			SubscriptionMode::WebSocket => f.write_str("WebSocket"),
			SubscriptionMode::HttpPolling => f.write_str("HTTP"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_mode_from_url() {
		assert_eq!(
			SubscriptionMode::from_rpc_url("wss://rpc.example.com"),
			SubscriptionMode::WebSocket
		);
		assert_eq!(
			SubscriptionMode::from_rpc_url("ws://localhost:8546"),
			SubscriptionMode::WebSocket
		);
		assert_eq!(
			SubscriptionMode::from_rpc_url("https://rpc.example.com"),
			SubscriptionMode::HttpPolling
		);
		assert_eq!(
			SubscriptionMode::from_rpc_url("http://localhost:8545"),
			SubscriptionMode::HttpPolling
		);
	}
}
