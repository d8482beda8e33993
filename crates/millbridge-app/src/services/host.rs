// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host services: owns the bridge and its method channel for the lifetime of
// the console session, and tears the bridge down when the host goes away.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use millbridge_bridge::{DeliveryContext, EngineBridge, EngineChannel, MethodCall, MethodResult, TeardownOutcome};
use millbridge_core::config::BridgeConfig;
use millbridge_core::error::Result;
use millbridge_engine::{EngineFactory, EngineProxy, engine_from_config};

use super::config_store::persist_config;

/// Everything the console front end talks to.
pub struct HostServices {
    data_dir: PathBuf,
    bridge: Arc<EngineBridge>,
    channel: EngineChannel,
}

impl HostServices {
    /// Start a bridge over the engine described by `config.engine`.
    pub fn init(
        config: BridgeConfig,
        data_dir: PathBuf,
        context: Arc<dyn DeliveryContext>,
    ) -> Result<Self> {
        let engine = config.engine.clone();
        let factory: Arc<dyn EngineFactory> =
            Arc::new(move || -> Result<Box<dyn EngineProxy>> { Ok(engine_from_config(&engine)) });
        Self::with_factory(config, factory, data_dir, context)
    }

    /// Start a bridge over an arbitrary engine factory.
    pub fn with_factory(
        config: BridgeConfig,
        factory: Arc<dyn EngineFactory>,
        data_dir: PathBuf,
        context: Arc<dyn DeliveryContext>,
    ) -> Result<Self> {
        let bridge = Arc::new(EngineBridge::new(config, factory)?);
        bridge.start()?;
        let channel = EngineChannel::new(
            bridge.config().channel_name.clone(),
            Arc::clone(&bridge),
            context,
        );
        tracing::info!(channel = %channel.name(), "host services initialised");
        Ok(Self {
            data_dir,
            bridge,
            channel,
        })
    }

    pub fn handle(&self, call: MethodCall, result: Box<dyn MethodResult>) {
        self.channel.handle(call, result);
    }

    pub fn bridge(&self) -> &EngineBridge {
        &self.bridge
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Persist the running config to the data dir.
    pub fn save_config(&self) -> Result<()> {
        persist_config(&self.data_dir, self.bridge.config())
    }

    /// Host is going away: drain the bridge.
    pub fn shutdown(&self) -> TeardownOutcome {
        let outcome = self.bridge.stop();
        if !outcome.is_clean() {
            tracing::warn!(?outcome, "engine bridge did not drain cleanly");
        }
        outcome
    }
}
