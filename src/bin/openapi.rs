use anyhow::Result;

// Print the OpenAPI document so it can be committed or fed to client generators.
fn main() -> Result<()> {
    let doc = portal::portal::openapi().to_pretty_json()?;
    println!("{doc}");
    Ok(())
}
