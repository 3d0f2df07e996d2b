use std::path::Path;

use devcontainer::Templates;
use stacked_errors::{ensure, ensure_eq, Result, StackableErr};
use tokio::fs;

async fn write_templates(dir: &Path) -> Result<()> {
    fs::write(dir.join("Dockerfile.cuda"), "FROM cuda\n").await.stack()?;
    fs::write(dir.join("Dockerfile.ubuntu"), "ARG SDK_IMAGE\nFROM ${SDK_IMAGE}\n\n")
        .await
        .stack()?;
    // none of these are templates
    fs::write(dir.join("README.md"), "templates").await.stack()?;
    fs::write(dir.join("Dockerfile."), "").await.stack()?;
    fs::write(dir.join("Containerfile.alpine"), "FROM alpine").await.stack()?;
    fs::create_dir(dir.join("Dockerfile.dir")).await.stack()?;
    Ok(())
}

#[tokio::test]
async fn names_only_include_dockerfile_templates() -> Result<()> {
    let dir = tempfile::tempdir().stack()?;
    write_templates(dir.path()).await?;
    let templates = Templates::new(dir.path());
    ensure_eq!(templates.names().await?, vec!["cuda", "ubuntu"]);
    Ok(())
}

#[tokio::test]
async fn read_is_verbatim() -> Result<()> {
    let dir = tempfile::tempdir().stack()?;
    write_templates(dir.path()).await?;
    let templates = Templates::new(dir.path());
    ensure_eq!(
        templates.read("ubuntu").await?.as_str(),
        "ARG SDK_IMAGE\nFROM ${SDK_IMAGE}\n\n"
    );
    ensure_eq!(templates.read("cuda").await?.as_str(), "FROM cuda\n");
    Ok(())
}

#[tokio::test]
async fn unknown_templates_are_errors() -> Result<()> {
    let dir = tempfile::tempdir().stack()?;
    write_templates(dir.path()).await?;
    let templates = Templates::new(dir.path());
    ensure!(templates.read("nonexistent").await.is_err());
    ensure!(templates.read("dir").await.is_err());
    ensure!(templates.read("").await.is_err());
    ensure!(templates.read("../Dockerfile.cuda").await.is_err());
    ensure!(templates.generate("nonexistent").await.is_err());
    Ok(())
}

#[tokio::test]
async fn missing_directory_has_no_templates() -> Result<()> {
    let dir = tempfile::tempdir().stack()?;
    let templates = Templates::new(dir.path().join("nonexistent"));
    ensure!(templates.names().await?.is_empty());
    ensure!(templates.read("cuda").await.is_err());
    Ok(())
}

#[tokio::test]
async fn shipped_templates_default_an_empty_sdk_image() -> Result<()> {
    let templates = Templates::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates"));
    let names = templates.names().await?;
    ensure_eq!(names, vec!["cuda", "rust", "ubuntu"]);
    for name in &names {
        let contents = templates.read(name).await?;
        // the build always passes `SDK_IMAGE`, empty selects the default base
        ensure!(contents.contains("\nARG SDK_IMAGE\n"));
        ensure!(contents.contains("\nFROM ${SDK_IMAGE:-"));
    }
    Ok(())
}
