use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use learn_quiz::clients::{LocalStore, PortalClient};
use learn_quiz::config::Config;
use learn_quiz::models::question::{ModuleId, QuizId};
use learn_quiz::orchestrator::{instructor_session, run_learner_session, stdio};
use learn_quiz::utils::logging;

#[derive(Parser, Debug)]
#[command(name = "learn-quiz", version, about = "Upload module quizzes and take randomized attempts")]
struct Cli {
    /// 课程门户 API 地址
    #[arg(long, env = "QUIZ_API_BASE_URL", global = true)]
    api_base_url: Option<String>,

    /// 显示详细日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 从模块题库随机组卷并作答
    Take {
        #[arg(long)]
        module: ModuleId,
        /// 题目数
        #[arg(long)]
        count: Option<usize>,
    },
    /// 用本地 TOML 测验组卷作答，不连接课程门户
    Practice {
        /// 存放 TOML 测验的目录
        #[arg(long)]
        drafts: PathBuf,
        #[arg(long)]
        count: Option<usize>,
    },
    /// 解析文档，自测后确认保存
    Preview {
        #[arg(long)]
        module: ModuleId,
        file: PathBuf,
    },
    /// 解析文档并直接保存
    Upload {
        #[arg(long)]
        module: ModuleId,
        file: PathBuf,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// 保存一份手工编写的 TOML 测验
    Commit {
        #[arg(long)]
        module: ModuleId,
        draft: PathBuf,
    },
    /// 列出模块下的测验
    List {
        #[arg(long)]
        module: ModuleId,
    },
    /// 删除一个测验
    Delete {
        #[arg(long)]
        module: ModuleId,
        quiz_id: QuizId,
    },
}

const PRACTICE_MODULE: ModuleId = 1;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let mut config = Config::from_env();
    if let Some(url) = cli.api_base_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }
    config.verbose_logging |= cli.verbose;
    config.validate()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    let mut terminal = stdio();

    if let Command::Practice { drafts, count } = &cli.command {
        logging::log_startup("practice", PRACTICE_MODULE, None);
        let store = LocalStore::new();
        instructor_session::stock_local_store(&store, PRACTICE_MODULE, drafts).await?;
        run_learner_session(&store, &config, PRACTICE_MODULE, *count, &mut terminal).await?;
        return Ok(());
    }

    let portal = PortalClient::new(&config)?;
    match cli.command {
        Command::Take { module, count } => {
            logging::log_startup("take", module, Some(&config.api_base_url));
            let summary = run_learner_session(&portal, &config, module, count, &mut terminal).await?;
            info!("共完成 {} 次作答", summary.results.len());
        }
        Command::Preview { module, file } => {
            logging::log_startup("preview", module, Some(&config.api_base_url));
            instructor_session::preview_document(&portal, &config, module, &file, &mut terminal).await?;
        }
        Command::Upload {
            module,
            file,
            title,
            description,
        } => {
            logging::log_startup("upload", module, Some(&config.api_base_url));
            instructor_session::upload_document(&portal, &config, module, &file, &title, &description, &mut terminal)
                .await?;
        }
        Command::Commit { module, draft } => {
            logging::log_startup("commit", module, Some(&config.api_base_url));
            instructor_session::commit_draft(&portal, module, &draft, &mut terminal).await?;
        }
        Command::List { module } => {
            logging::log_startup("list", module, Some(&config.api_base_url));
            instructor_session::list_quizzes(&portal, module, &mut terminal).await?;
        }
        Command::Delete { module, quiz_id } => {
            logging::log_startup("delete", module, Some(&config.api_base_url));
            instructor_session::delete_quiz(&portal, module, quiz_id, &mut terminal).await?;
        }
        Command::Practice { .. } => {}
    }

    Ok(())
}
