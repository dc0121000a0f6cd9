//! 配置校验模块
//!
//! 校验规则：
//! - inbox_capacity > 0
//! - store.max_entries > 0
//! - exporter 名称非空且唯一
//! - exporter 必填参数齐全 (file: path, http: url)

use std::collections::HashSet;

use contracts::{ContractError, ExporterType, ServiceConfig};

/// 校验 ServiceConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &ServiceConfig) -> Result<(), ContractError> {
    validate_inbox(config)?;
    validate_store(config)?;
    validate_exporter_names(config)?;
    validate_exporter_params(config)?;
    Ok(())
}

fn validate_inbox(config: &ServiceConfig) -> Result<(), ContractError> {
    if config.inbox_capacity == 0 {
        return Err(ContractError::config_validation(
            "inbox_capacity",
            "inbox_capacity must be > 0",
        ));
    }
    Ok(())
}

fn validate_store(config: &ServiceConfig) -> Result<(), ContractError> {
    if config.store.max_entries == 0 {
        return Err(ContractError::config_validation(
            "store.max_entries",
            "max_entries must be > 0",
        ));
    }
    Ok(())
}

/// 校验 exporter 名称 (非空且唯一)
fn validate_exporter_names(config: &ServiceConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, exporter) in config.exporters.iter().enumerate() {
        if exporter.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("exporters[{}].name", idx),
                "exporter name cannot be empty",
            ));
        }
        if !seen.insert(&exporter.name) {
            return Err(ContractError::config_validation(
                format!("exporters[name={}]", exporter.name),
                "duplicate exporter name",
            ));
        }
    }
    Ok(())
}

/// 校验 exporter 类型特定参数
fn validate_exporter_params(config: &ServiceConfig) -> Result<(), ContractError> {
    for exporter in &config.exporters {
        let required = match exporter.exporter_type {
            ExporterType::Log => continue,
            ExporterType::File => "path",
            ExporterType::Http => "url",
        };

        let present = exporter
            .params
            .get(required)
            .is_some_and(|value| !value.trim().is_empty());
        if !present {
            return Err(ContractError::config_validation(
                format!("exporters[{}].params.{}", exporter.name, required),
                format!("'{}' is required for {:?} exporters", required, exporter.exporter_type),
            ));
        }
    }
    Ok(())
}
