// ==========================================
// 批量数据导入引擎 - 权限判定
// ==========================================
// 职责: 判定当前执行人是否拥有执行导入的权限
// 约束: 系统执行人（后台任务）自动通过
// ==========================================

use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;

/// 执行导入所需的权限名
pub const IMPORT_EXECUTE_PERMISSION: &str = "configuration.import.execute";

// ==========================================
// ImportPrincipal - 执行人
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPrincipal {
    pub name: String,
    pub email: Option<String>,
    /// 系统/后台任务执行人
    pub is_system: bool,
}

impl ImportPrincipal {
    pub fn system() -> Self {
        Self {
            name: "system".to_string(),
            email: None,
            is_system: true,
        }
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            is_system: false,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

impl fmt::Display for ImportPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.email {
            Some(email) => write!(f, "{} <{}>", self.name, email),
            None => write!(f, "{}", self.name),
        }
    }
}

// ==========================================
// PermissionService Trait
// ==========================================
// 实现者: StaticPermissionService
#[async_trait]
pub trait PermissionService: Send + Sync {
    /// 当前执行人
    fn current_principal(&self) -> ImportPrincipal;

    /// 判定执行人是否拥有某个权限
    async fn authorize(&self, principal: &ImportPrincipal, permission: &str) -> bool;

    /// 判定当前执行人（系统执行人直接通过）
    async fn is_authorized(&self, permission: &str) -> bool {
        let principal = self.current_principal();
        if principal.is_system {
            return true;
        }
        self.authorize(&principal, permission).await
    }
}

// ==========================================
// StaticPermissionService - 固定授权表
// ==========================================
#[derive(Debug, Clone)]
pub struct StaticPermissionService {
    principal: ImportPrincipal,
    granted: HashSet<String>,
}

impl StaticPermissionService {
    /// 以系统执行人运行（不做检查）
    pub fn system() -> Self {
        Self {
            principal: ImportPrincipal::system(),
            granted: HashSet::new(),
        }
    }

    /// 以普通执行人运行，权限表为空
    pub fn for_principal(principal: ImportPrincipal) -> Self {
        Self {
            principal,
            granted: HashSet::new(),
        }
    }

    pub fn grant(mut self, permission: impl Into<String>) -> Self {
        self.granted.insert(permission.into());
        self
    }
}

impl Default for StaticPermissionService {
    fn default() -> Self {
        Self::system()
    }
}

#[async_trait]
impl PermissionService for StaticPermissionService {
    fn current_principal(&self) -> ImportPrincipal {
        self.principal.clone()
    }

    async fn authorize(&self, principal: &ImportPrincipal, permission: &str) -> bool {
        let granted = self.granted.contains(permission);
        if !granted {
            tracing::debug!(principal = %principal, permission, "权限不足");
        }
        granted
    }
}
