//! Role command implementation.

use smchainer_core::TrainingEnvironment;
use smchainer_training::{master_of, resolve_role, use_mpi};

pub fn execute(env: &TrainingEnvironment, json: bool) -> anyhow::Result<()> {
    let role = resolve_role(&env.current_host, &env.hosts)?;
    let master = master_of(&env.hosts)?;
    let distributed = use_mpi(&env.hyperparameters, env.host_count())?;

    if json {
        let output = serde_json::json!({
            "current_host": env.current_host,
            "master": master,
            "role": role,
            "use_mpi": distributed,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("current host: {}", env.current_host);
        println!("master:       {master}");
        println!("role:         {role}");
        println!("use mpi:      {distributed}");
    }
    Ok(())
}
