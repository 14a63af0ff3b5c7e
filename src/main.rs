use anyhow::Result;
use tracing::info;

use envirollm::EnviroLlm;

#[tokio::main]
async fn main() -> Result<()> {
    let app = EnviroLlm::new()?;

    // Display host information before serving
    let specs = app.get_sensor_reader().system_specs();
    println!(
        "CPU: {} with {} physical cores, {} logical cores",
        specs.cpu_brand, specs.cpu_cores_physical, specs.cpu_cores_logical
    );
    println!("Memory: {:.1} GB total", specs.memory_gb);
    if specs.gpu_available && !specs.gpus.is_empty() {
        println!("GPUs detected:");
        for gpu in &specs.gpus {
            println!(
                "  GPU {}: {}, {:.2} GB memory",
                gpu.index, gpu.name, gpu.memory_total_gb
            );
        }
    } else {
        println!("No GPUs detected");
    }

    let addr = app.listen_addr()?;
    println!("EnviroLLM API listening on http://{}", addr);

    tokio::select! {
        result = app.serve() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
