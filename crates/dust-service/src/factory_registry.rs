//! Registry of every implementation factory compiled into the binary.
//!
//! Configuration names implementations by string; this module resolves those
//! names to factories and hands them to the builder.

use dust_account::AccountFactory;
use dust_config::Config;
use dust_core::{AggregatorBuilder, AggregatorFactories, DustAggregator};
use dust_delivery::DeliveryFactory;
use dust_price::PriceTableFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

pub struct FactoryRegistry {
	pub prices: HashMap<String, PriceTableFactory>,
	pub accounts: HashMap<String, AccountFactory>,
	pub delivery: HashMap<String, DeliveryFactory>,
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry {
			prices: HashMap::new(),
			accounts: HashMap::new(),
			delivery: HashMap::new(),
		};

		for (name, factory) in dust_price::get_all_implementations() {
			tracing::debug!("Registering price table implementation: {}", name);
			registry.prices.insert(name.to_string(), factory);
		}
		for (name, factory) in dust_account::get_all_implementations() {
			tracing::debug!("Registering account implementation: {}", name);
			registry.accounts.insert(name.to_string(), factory);
		}
		for (name, factory) in dust_delivery::get_all_implementations() {
			tracing::debug!("Registering delivery implementation: {}", name);
			registry.delivery.insert(name.to_string(), factory);
		}

		registry
	})
}

/// Picks the factories for the implementation names yielded by `$names`,
/// failing on a name nothing is registered under.
macro_rules! build_factories {
	($registry:expr, $names:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $names {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

/// Builds the aggregator from configuration using the registered factories.
pub fn build_aggregator_from_config(
	config: Config,
) -> Result<DustAggregator, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let price_factories =
		build_factories!(registry, config.prices.implementations.keys(), prices, "price table");
	let account_factories = build_factories!(
		registry,
		config.accounts.values().map(|account| &account.implementation),
		accounts,
		"account"
	);
	let delivery_factories = build_factories!(
		registry,
		config.delivery.implementations.keys(),
		delivery,
		"delivery"
	);

	let factories = AggregatorFactories {
		price_factories,
		account_factories,
		delivery_factories,
	};

	Ok(AggregatorBuilder::new(config).build(factories)?)
}
