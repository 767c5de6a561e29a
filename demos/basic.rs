use recruit_client::{ApiClient, UploadForm};
use serde_json::Value;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let api = ApiClient::from_env().map_err(anyhow::Error::msg)?;

    if let Ok(token) = std::env::var("RECRUIT_API_TOKEN") {
        api.set_token(Some(token.as_str()));
    }

    let jobs = api.get::<Vec<Value>>("/jobs").await?;
    println!("{}: {} jobs", jobs.message, jobs.data.unwrap_or_default().len());

    let cv = std::fs::read("cv.pdf")?;
    let form = UploadForm::new()
        .text("job_id", "1")
        .file("cv", "cv.pdf", cv, Some("application/pdf"));

    match api.upload::<Value>("/cv/upload", form).await {
        Ok(envelope) => println!("uploaded: {}", envelope.message),
        Err(err) => println!("upload failed after {} attempt(s): {err}", err.attempts()),
    }

    Ok(())
}
