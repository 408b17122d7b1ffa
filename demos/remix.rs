//! Remix a local photo into a landscape poster.
//!
//! Run with: `cargo run --example remix -- <input_image>`
//!
//! Requires `OPENAI_API_KEY` environment variable.

use reimagine::{AspectChoice, OpenAiClient, Session, SourceImage};

#[tokio::main]
async fn main() -> reimagine::Result<()> {
    let input_path = std::env::args()
        .nth(1)
        .expect("Usage: remix <input_image>");

    let session = Session::builder()
        .openai(OpenAiClient::builder().build())
        .build()?;

    session.upload(Some(SourceImage::from_path(&input_path).await?));
    session.set_prompt("turn it into a vintage travel poster");
    session.set_aspect(AspectChoice::Landscape);

    println!("Generating (two API calls, this can take a while)...");
    session.generate().await?;

    if let Some(image) = session.generated() {
        if let Some(description) = &image.metadata.description {
            println!("Description used: {description}");
        }
    }
    if let Some(path) = session.download(".").await? {
        println!("Saved to {}", path.display());
    }

    Ok(())
}
