use std::time::Duration;

use editstream::{spawn_edit_logger, EditCountsConfig, EditCountsWriter, EditStreamConfig, EditStreamPipeline};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = EditStreamConfig::default();
    println!("tailing {} (ctrl-c to stop)", config.url);

    let handle = EditStreamPipeline::new(config)?.start()?;

    let counts = EditCountsWriter::new(
        EditCountsConfig::new("./edit-counts.json").with_write_every(16),
    )?;
    let counts_task = tokio::spawn(counts.run(handle.subscribe()));
    let logger_task = spawn_edit_logger(handle.subscribe());

    let mut printer = handle.subscribe();
    let printer_task = tokio::spawn(async move {
        while let Some(edit) = printer.recv().await {
            let marker = if edit.bot { "bot" } else { "human" };
            println!("[{}] {} edited {:?} ({marker})", edit.wiki, edit.user, edit.title);
        }
    });

    tokio::signal::ctrl_c().await?;
    println!("shutting down, metrics: {:?}", handle.metrics());
    handle.shutdown(Duration::from_secs(5)).await?;

    counts_task.await??;
    println!("logged {} edits", logger_task.await?);
    printer_task.await?;
    Ok(())
}
