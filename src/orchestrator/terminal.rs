//! 终端输入输出
//!
//! 会话只通过这里读写，测试时可以换成内存中的脚本和缓冲区。

use regex::Regex;
use std::io;
use std::sync::OnceLock;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};

use crate::error::ValidationError;
use crate::models::question::{OptionLetter, Question};

pub struct Terminal<R, W> {
    lines: Lines<R>,
    out: W,
}

/// 标准输入输出
pub fn stdio() -> Terminal<BufReader<Stdin>, Stdout> {
    Terminal::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
}

impl<R, W> Terminal<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, out: W) -> Self {
        Self {
            lines: reader.lines(),
            out,
        }
    }

    pub async fn say(&mut self, text: impl AsRef<str>) -> io::Result<()> {
        self.out.write_all(text.as_ref().as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await
    }

    /// 打印提示并读一行；输入结束时返回 `None`
    pub async fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.out.write_all(prompt.as_bytes()).await?;
        self.out.write_all(b" ").await?;
        self.out.flush().await?;
        Ok(self.lines.next_line().await?.map(|line| line.trim().to_string()))
    }

    /// 是/否提问，默认否
    pub async fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        let answer = self.ask(&format!("{} [y/N]", prompt)).await?;
        Ok(matches!(answer.as_deref(), Some("y" | "Y" | "yes" | "Yes")))
    }

    /// 打印一道题和它的选项
    pub async fn show_question(&mut self, number: usize, question: &Question) -> io::Result<()> {
        self.say(format!("{}. {}", number, question.question_text)).await?;
        for option in question.options() {
            self.say(format!("   {}) {}", option.letter, option.text)).await?;
        }
        Ok(())
    }

    pub fn into_output(self) -> W {
        self.out
    }
}

/// 作答输入，例如 `3 b`、`3.B`、`3) c`
///
/// # 返回
/// 不是作答格式时返回 `None`；题号从 1 开始
pub fn parse_answer(input: &str) -> Option<(usize, Result<OptionLetter, ValidationError>)> {
    static ANSWER: OnceLock<Option<Regex>> = OnceLock::new();
    let re = ANSWER
        .get_or_init(|| Regex::new(r"^\s*(\d+)\s*[.):]?\s*([A-Za-z]+)\s*$").ok())
        .as_ref()?;

    let caps = re.captures(input)?;
    let number: usize = caps.get(1)?.as_str().parse().ok()?;
    Some((number, caps.get(2)?.as_str().parse()))
}
