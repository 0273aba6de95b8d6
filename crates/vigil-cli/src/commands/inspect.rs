use vigil_core::VigilConfig;

use super::open_catalog;

pub async fn triggers(config: &VigilConfig, tenant: &str) -> anyhow::Result<()> {
    let catalog = open_catalog(config)?;
    let triggers = catalog.get_triggers(tenant).await?;
    println!("{}", serde_json::to_string_pretty(&triggers)?);
    Ok(())
}

pub async fn conditions(config: &VigilConfig, tenant: &str, trigger: &str) -> anyhow::Result<()> {
    let catalog = open_catalog(config)?;
    let conditions = catalog.get_trigger_conditions(tenant, trigger, None).await?;
    let dampenings = catalog.get_trigger_dampenings(tenant, trigger, None).await?;
    let out = serde_json::json!({
        "conditions": conditions,
        "dampenings": dampenings,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

pub async fn tagged(config: &VigilConfig, tenant: &str, category: &str, name: &str) -> anyhow::Result<()> {
    let catalog = open_catalog(config)?;
    for trigger_id in catalog.get_tagged_triggers(tenant, category, name).await? {
        println!("{trigger_id}");
    }
    Ok(())
}
