//! Print the mpirun invocation for this cluster.

use smchainer_core::{CoordinationConfig, TrainingEnvironment};
use smchainer_training::MpiCommand;

pub fn execute(env: &TrainingEnvironment, config: &CoordinationConfig, json: bool) -> anyhow::Result<()> {
    let command = MpiCommand::for_environment(env, config)?;

    if json {
        let mut argv = vec![command.program().to_string()];
        argv.extend(command.args());
        println!("{}", serde_json::to_string_pretty(&argv)?);
    } else {
        println!("{command}");
    }
    Ok(())
}
