use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use index_gen::config::Config;
use index_gen::core::IndexVersion;
use index_gen::event::{JobOptions, RecordingQueue, RequestContext};
use index_gen::index::VersionRegistry;
use index_gen::storage::JsonFileStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "index-gen", about = "Manage search index generations per indexable type")]
struct Cli {
    /// TOML 配置文件
    #[arg(long, default_value = "index-gen.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 列出某类型的全部版本
    List { slug: String },
    /// 显示生效版本
    Active { slug: String },
    /// 新建一个（未激活的）版本
    Add { slug: String },
    /// 激活指定版本
    Activate { slug: String, number: u32 },
    /// 在一次模拟请求里入队对象，打印复制结果
    Simulate {
        slug: String,
        #[arg(required = true)]
        object_ids: Vec<u64>,
    },
}

fn print_version(v: &IndexVersion, index_name: &str) {
    let ts = |t: Option<i64>| t.map(|t| t.to_string()).unwrap_or_else(|| "-".into());
    println!(
        "{:>4}  {:<6}  created={:<12} activated={:<12} index={}",
        v.number,
        if v.active { "active" } else { "" },
        ts(v.created_time),
        ts(v.activated_time),
        index_name
    );
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;
    let indexables = cfg.indexables();

    let store = Arc::new(JsonFileStore::new(cfg.store_path.clone()));
    let registry =
        VersionRegistry::new(store, cfg.scope()).with_index_prefix(cfg.index_prefix.clone());

    let resolve = |slug: &str| {
        indexables
            .get(slug)
            .ok_or_else(|| anyhow::anyhow!("unknown indexable type `{}`", slug))
    };

    match cli.command {
        Command::List { slug } => {
            let indexable = resolve(&slug)?;
            for v in &registry.get_versions(&slug) {
                print_version(v, &registry.index_name(&indexable, v.number));
            }
        }
        Command::Active { slug } => {
            let indexable = resolve(&slug)?;
            let n = registry.get_active_version_number(&slug);
            match registry.get_version(&slug, n) {
                Some(v) => print_version(&v, &registry.index_name(&indexable, n)),
                None => println!("{}", n),
            }
        }
        Command::Add { slug } => {
            let indexable = resolve(&slug)?;
            let v = registry.add_version(&slug)?;
            print_version(&v, &registry.index_name(&indexable, v.number));
        }
        Command::Activate { slug, number } => {
            let indexable = resolve(&slug)?;
            let v = registry.activate_version(&slug, number)?;
            print_version(&v, &registry.index_name(&indexable, v.number));
        }
        Command::Simulate { slug, object_ids } => {
            resolve(&slug)?;
            let queue = RecordingQueue::new();
            let mut ctx = RequestContext::new(&registry, &indexables, &queue);
            for id in object_ids {
                let v = ctx.queue_object(id, &slug, JobOptions::new())?;
                info!("Queued object {} of {} against v{}", id, slug, v);
            }
            let report = ctx.shutdown();
            for job in queue.jobs() {
                println!("{}\t{}\tv{}", job.slug, job.object_id, job.index_version());
            }
            print!("{}", report);
        }
    }

    Ok(())
}
