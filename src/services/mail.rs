// ==========================================
// 批量数据导入引擎 - 邮件发送
// ==========================================
// 职责: 解析默认发件账户并发送完成报告
// 说明: 邮件传输由宿主实现，内置实现只写 tracing
// ==========================================

use crate::importer::error::ImporterResult;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// 发件账户
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAccount {
    pub email: String,
    pub display_name: String,
}

impl EmailAccount {
    pub fn new(email: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: display_name.into(),
        }
    }
}

/// 待发送邮件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: EmailAccount,
    pub to: String,
    pub subject: String,
    pub body: String,
}

// ==========================================
// MailService Trait
// ==========================================
#[async_trait]
pub trait MailService: Send + Sync {
    /// 默认发件账户（未配置时为 None）
    async fn default_account(&self) -> ImporterResult<Option<EmailAccount>>;

    /// 建立连接并发送
    async fn send(&self, message: &MailMessage) -> ImporterResult<()>;
}

// ==========================================
// LoggingMailService - 只记录日志
// ==========================================
/// 保留的最近邮件数
pub const RECENT_MESSAGE_CAPACITY: usize = 32;

#[derive(Debug, Default)]
pub struct LoggingMailService {
    account: Option<EmailAccount>,
    recent: Mutex<VecDeque<MailMessage>>,
}

impl LoggingMailService {
    pub fn new(account: Option<EmailAccount>) -> Self {
        Self {
            account,
            recent: Mutex::new(VecDeque::with_capacity(RECENT_MESSAGE_CAPACITY)),
        }
    }

    /// 最近"发送"的邮件（最多 RECENT_MESSAGE_CAPACITY 封，旧的在前）
    pub fn sent_messages(&self) -> Vec<MailMessage> {
        self.recent
            .lock()
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MailService for LoggingMailService {
    async fn default_account(&self) -> ImporterResult<Option<EmailAccount>> {
        Ok(self.account.clone())
    }

    async fn send(&self, message: &MailMessage) -> ImporterResult<()> {
        tracing::info!(
            from = %message.from.email,
            to = %message.to,
            subject = %message.subject,
            "导入报告邮件\n{}",
            message.body
        );
        if let Ok(mut recent) = self.recent.lock() {
            if recent.len() == RECENT_MESSAGE_CAPACITY {
                recent.pop_front();
            }
            recent.push_back(message.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logging_mail_service_records_messages() {
        let account = EmailAccount::new("noreply@example.com", "Store");
        let service = LoggingMailService::new(Some(account.clone()));

        assert_eq!(service.default_account().await.unwrap(), Some(account.clone()));

        let message = MailMessage {
            from: account,
            to: "admin@example.com".to_string(),
            subject: "s".to_string(),
            body: "b".to_string(),
        };
        service.send(&message).await.unwrap();

        assert_eq!(service.sent_messages(), vec![message]);
    }

    #[tokio::test]
    async fn test_recent_messages_are_capped() {
        let account = EmailAccount::new("noreply@example.com", "Store");
        let service = LoggingMailService::new(Some(account.clone()));

        for i in 0..RECENT_MESSAGE_CAPACITY + 8 {
            let message = MailMessage {
                from: account.clone(),
                to: "admin@example.com".to_string(),
                subject: format!("报告 {}", i),
                body: String::new(),
            };
            service.send(&message).await.unwrap();
        }

        let sent = service.sent_messages();
        assert_eq!(sent.len(), RECENT_MESSAGE_CAPACITY);
        assert_eq!(sent[0].subject, "报告 8");
        assert_eq!(
            sent.last().map(|m| m.subject.clone()),
            Some(format!("报告 {}", RECENT_MESSAGE_CAPACITY + 7))
        );
    }
}
