//! Operation → handler mapping injected into the fleet runner.

use crate::account::Account;
use crate::error::ConfigError;
use crate::operation::Operation;
use crate::traits::ModuleHandler;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default, Clone)]
pub struct ModuleRegistry {
    handlers: HashMap<Operation, Arc<dyn ModuleHandler>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, operation: Operation, handler: Arc<dyn ModuleHandler>) -> Self {
        self.handlers.insert(operation, handler);
        self
    }

    pub fn insert(&mut self, operation: Operation, handler: Arc<dyn ModuleHandler>) {
        self.handlers.insert(operation, handler);
    }

    pub fn get(&self, operation: Operation) -> Option<&Arc<dyn ModuleHandler>> {
        self.handlers.get(&operation)
    }

    pub fn contains(&self, operation: Operation) -> bool {
        self.handlers.contains_key(&operation)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Fails on the first operation, across all accounts, with no handler.
    pub fn ensure_covers(&self, accounts: &[Account]) -> Result<(), ConfigError> {
        for account in accounts {
            if let Some(missing) = account
                .operations()
                .iter()
                .find(|op| !self.contains(**op))
            {
                return Err(ConfigError::UnregisteredOperation {
                    operation: missing.to_string(),
                    address: account.address().to_string(),
                });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut registered: Vec<_> = self.handlers.keys().collect();
        registered.sort();
        f.debug_struct("ModuleRegistry")
            .field("registered", &registered)
            .finish()
    }
}
