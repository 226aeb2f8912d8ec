use lambda_runtime::{LambdaEvent, service_fn};
use lambda_version_gc::{gc_function_versions, set_up_logger};
use serde_json::{Value, json};
use std::error::Error;

type LambdaError = Box<dyn Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    set_up_logger(module_path!(), false)?;

    let func = service_fn(function);
    lambda_runtime::run(func).await?;
    Ok(())
}

async fn function(_event: LambdaEvent<Value>) -> Result<Value, LambdaError> {
    let summary = gc_function_versions(false).await?;

    Ok(json!({
        "message": "Successful clean!",
        "summary": summary,
    }))
}
