use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use aweme_harvester::models::{
    ApiError, AppError, DownloadEvent, DownloadEventType, DownloadJob, DownloadOutcome, DownloadReport,
    FetchEvent, FetchEventType, NamingToken, Selection, SortKey, SortOrder, TypeFilter,
    WalkOutcome,
};
use aweme_harvester::services::{AppConfig, HarvestService};
use aweme_harvester::utils::logger;
use aweme_harvester::utils::time_utils::format_created_at;

/// 批量获取并下载账号的全部作品
#[derive(Parser)]
#[command(name = "aweme-harvester")]
#[command(about = "Fetch and download every post of an account")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 获取作品列表
    Fetch {
        username: String,
        /// 页间延迟(毫秒)
        #[arg(long)]
        delay: Option<u64>,
        /// 结果写入JSON文件
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// 获取并批量下载
    Download {
        username: String,
        #[arg(long)]
        delay: Option<u64>,
        #[arg(long = "batch-size")]
        batch_size: Option<usize>,
        /// 批间延迟(毫秒)
        #[arg(long = "batch-delay")]
        batch_delay: Option<u64>,
        /// 逗号分隔的命名标记: order,id,timestamp,desc
        #[arg(long)]
        naming: Option<String>,
        #[arg(long)]
        dest: Option<PathBuf>,
        /// all / video / photo
        #[arg(long = "type", default_value = "all")]
        type_filter: String,
        /// 只下载ID包含该字符串的作品
        #[arg(long)]
        id: Option<String>,
        /// 只下载描述包含该字符串的作品 (不区分大小写)
        #[arg(long)]
        search: Option<String>,
        /// createdAt / likes / comments / views / collects
        #[arg(long)]
        sort: Option<String>,
        /// 降序排序
        #[arg(long)]
        desc: bool,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// 下载单个作品
    Single {
        aweme_id: String,
        #[arg(long)]
        dest: Option<PathBuf>,
        #[arg(long)]
        naming: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("配置加载失败: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // 初始化日志系统,guard 需存活到进程结束
    let _guard = match logger::init(&config.log_dir) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("日志系统初始化失败: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: AppConfig) -> Result<(), AppError> {
    let service = HarvestService::from_config(&config)?;
    let cancel_token = cancel_on_ctrl_c();

    match command {
        Command::Fetch {
            username,
            delay,
            output,
        } => {
            let delay = delay.map(Duration::from_millis).unwrap_or(config.page_delay);
            let (events, fetch_log) = spawn_fetch_logger();
            let acquisition = service
                .acquire(&username, delay, cancel_token, Some(events))
                .await;
            finish_log(fetch_log).await;
            let acquisition = acquisition?;

            for (index, item) in acquisition.session.items.iter().enumerate() {
                println!(
                    "{:>5}  {}  {:<5}  {}  {}",
                    index + 1,
                    item.id,
                    item.aweme_type.as_str(),
                    format_created_at(item.created_at),
                    item.url
                );
            }

            if let Some(path) = output {
                let document = serde_json::json!({
                    "user": acquisition.user,
                    "items": acquisition.session.items,
                });
                let body = serde_json::to_string_pretty(&document)
                    .map_err(ApiError::from)?;
                tokio::fs::write(&path, body).await?;
                tracing::info!(path = %path.display(), "Items written");
            }

            acquisition.outcome?;
            Ok(())
        }

        Command::Download {
            username,
            delay,
            batch_size,
            batch_delay,
            naming,
            dest,
            type_filter,
            id,
            search,
            sort,
            desc,
            limit,
        } => {
            let mut selection =
                Selection::new().with_type_filter(type_filter.parse::<TypeFilter>()?);
            if let Some(needle) = id {
                selection = selection.with_id_filter(needle);
            }
            if let Some(needle) = search {
                selection = selection.with_description_filter(needle);
            }
            if let Some(key) = sort {
                let order = if desc {
                    SortOrder::Descending
                } else {
                    SortOrder::Ascending
                };
                selection = selection.sorted_by(key.parse::<SortKey>()?, order);
            }
            if let Some(limit) = limit {
                selection = selection.with_limit(limit);
            }
            let tokens = naming_tokens(naming.as_deref(), &config)?;

            let delay = delay.map(Duration::from_millis).unwrap_or(config.page_delay);
            let (events, fetch_log) = spawn_fetch_logger();
            let acquisition = service
                .acquire(&username, delay, cancel_token.clone(), Some(events))
                .await;
            finish_log(fetch_log).await;
            let acquisition = acquisition?;

            match &acquisition.outcome {
                Ok(WalkOutcome::Cancelled) => {
                    tracing::warn!("Fetch cancelled, nothing downloaded");
                    return Ok(());
                }
                Ok(WalkOutcome::Exhausted) => {}
                Err(e) => tracing::warn!(
                    error = %e,
                    accumulated = acquisition.session.len(),
                    "Fetch failed, downloading the items received so far"
                ),
            }

            let selected = selection.apply(&acquisition.session.items);
            let batch_delay_ms =
                batch_delay.unwrap_or_else(|| config.batch_delay.as_millis() as u64);
            let job = DownloadJob::new(
                selected,
                dest.unwrap_or_else(|| config.download_dir.clone()),
            )
            .with_naming_tokens(tokens)
            .with_owner(acquisition.owner())
            .with_batch_size(batch_size.unwrap_or(config.batch_size))
            .with_inter_batch_delay_ms(batch_delay_ms);

            let (events, download_log) = spawn_download_logger();
            let report = service.download(&job, cancel_token, Some(events)).await;
            finish_log(download_log).await;
            let report = report?;
            print_report(&report);

            acquisition.outcome?;
            Ok(())
        }

        Command::Single {
            aweme_id,
            dest,
            naming,
        } => {
            let tokens = naming_tokens(naming.as_deref(), &config)?;
            let report = service
                .download_single(
                    &aweme_id,
                    dest.unwrap_or_else(|| config.download_dir.clone()),
                    tokens,
                )
                .await?;
            print_report(&report);
            Ok(())
        }
    }
}

fn naming_tokens(raw: Option<&str>, config: &AppConfig) -> Result<Vec<NamingToken>, AppError> {
    match raw {
        Some(raw) => Ok(NamingToken::parse_list(raw)?),
        None => Ok(config.naming_tokens.clone()),
    }
}

/// Ctrl-C 触发协作式取消
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping at the next page or batch boundary");
            child.cancel();
        }
    });
    token
}

/// 事件输出为日志行
///
/// 发送端全部释放后任务结束,调用方等待 JoinHandle 以免丢失最后的日志
fn spawn_fetch_logger() -> (mpsc::UnboundedSender<FetchEvent>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<FetchEvent>();
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event.event_type {
                FetchEventType::PageFetched {
                    page,
                    items,
                    total_items,
                    has_more,
                } => tracing::info!(
                    page = page,
                    items = items.len(),
                    total_items = total_items,
                    has_more = has_more,
                    "Page received"
                ),
                FetchEventType::Cancelled { pages, total_items } => {
                    tracing::warn!(pages = pages, total_items = total_items, "Fetch cancelled")
                }
                _ => {}
            }
        }
    });
    (tx, handle)
}

fn spawn_download_logger() -> (mpsc::UnboundedSender<DownloadEvent>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<DownloadEvent>();
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let DownloadEventType::ItemFinished {
                item_id,
                success,
                current,
                total,
            } = event.event_type
            {
                tracing::info!(
                    item_id = %item_id,
                    success = success,
                    "Progress {}/{}",
                    current,
                    total
                );
            }
        }
    });
    (tx, handle)
}

async fn finish_log(handle: JoinHandle<()>) {
    if let Err(e) = handle.await {
        tracing::warn!(error = %e, "Event logger stopped abnormally");
    }
}

fn print_report(report: &DownloadReport) {
    let state = match report.outcome {
        DownloadOutcome::Completed => "completed",
        DownloadOutcome::Cancelled => "cancelled",
    };
    println!(
        "download {}: {}/{} items, {} failed, {} ms",
        state,
        report.progress.current,
        report.progress.total,
        report.progress.failed_ids.len(),
        report.duration_ms
    );
    for id in &report.progress.failed_ids {
        println!("  failed: {}", id);
    }
}
