//! Table definitions the persistence layer expects.
//!
//! Time columns are UTC timestamps, amounts are text decimal
//! representations, `chains.chain_type` is stored upper-cased and
//! `intent.status` is expected to carry a CHECK constraint restricting
//! it to `CREATED | PENDING | DONE | FAILED`. Schema migration is
//! managed outside this library.

diesel::table! {
	chains (id) {
		id -> Int8,
		chain_id -> Int8,
		name -> Text,
		chain_type -> Nullable<Text>,
		receiver_address -> Nullable<Text>,
		active -> Bool,
		created_at -> Timestamptz,
		updated_at -> Timestamptz,
	}
}

diesel::table! {
	rpcs (id) {
		id -> Int8,
		chain_id -> Int8,
		url -> Text,
		provider -> Nullable<Text>,
		agent_id -> Nullable<Int8>,
		active -> Bool,
		created_at -> Timestamptz,
		updated_at -> Timestamptz,
	}
}

diesel::table! {
	agents (id) {
		id -> Int8,
		uid -> Text,
		url -> Nullable<Text>,
		created_at -> Timestamptz,
		updated_at -> Timestamptz,
	}
}

diesel::table! {
	intent (id) {
		id -> Int8,
		quote_id -> Text,
		from_chain_id -> Int8,
		from_token_address -> Text,
		from_amount -> Text,
		to_chain_id -> Int8,
		to_token_address -> Text,
		to_amount -> Text,
		user_address -> Text,
		recipient_address -> Text,
		from_tx -> Text,
		from_nonce -> Int8,
		to_tx -> Nullable<Text>,
		to_nonce -> Nullable<Int8>,
		status -> Text,
		sub_status -> Nullable<Text>,
		quote_requested_at -> Timestamptz,
		from_tx_mined_at -> Timestamptz,
		to_tx_set_at -> Nullable<Timestamptz>,
		to_tx_mined_at -> Nullable<Timestamptz>,
		refund -> Bool,
		refund_tx -> Nullable<Text>,
		refund_tx_set_at -> Nullable<Timestamptz>,
		refund_tx_mined_at -> Nullable<Timestamptz>,
		block_hash -> Text,
		quorum -> Int4,
		retries -> Int4,
	}
}

diesel::table! {
	chain_tokens (id) {
		id -> Int8,
		chain_id -> Int8,
		address -> Text,
		decimals -> Int4,
		native -> Bool,
		balance -> Nullable<Text>,
		balance_formatted -> Nullable<Text>,
		updated_at -> Timestamptz,
	}
}

diesel::allow_tables_to_appear_in_same_query!(chains, rpcs, agents, intent, chain_tokens);
