// ==========================================
// 批量数据导入引擎 - 国际化
// ==========================================
// 文案: locales/zh-CN.yml, locales/en.yml（rust_i18n::i18n! 在 lib.rs 中初始化）
// 导入运行按 ImportSettings.locale 调用 t_for，不读写全局 locale
// ==========================================

/// 支持的语言（第一个为默认）
pub const SUPPORTED_LOCALES: [&str; 2] = ["zh-CN", "en"];

/// 将配置中的语言代码归一化为支持的语言
///
/// "en-US" / "EN" → "en"，"zh" / "zh-TW" / 未知 → "zh-CN"
pub fn normalize_locale(locale: &str) -> &'static str {
    let lang = locale
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase();
    match lang.as_str() {
        "en" => SUPPORTED_LOCALES[1],
        _ => SUPPORTED_LOCALES[0],
    }
}

pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置进程级默认语言（命令行启动时调用一次）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(normalize_locale(locale));
}

/// 按指定语言翻译，%{name} 占位符由 args 替换
///
/// # 示例
/// ```no_run
/// use data_import::i18n::t_for;
/// let msg = t_for("en", "import.file_not_found", &[("path", "/tmp/test.csv")]);
/// ```
pub fn t_for(locale: &str, key: &str, args: &[(&str, &str)]) -> String {
    let text = rust_i18n::t!(key, locale = normalize_locale(locale)).to_string();
    args.iter().fold(text, |text, (name, value)| {
        text.replace(&format!("%{{{}}}", name), value)
    })
}

/// 按全局语言翻译
pub fn t(key: &str) -> String {
    t_for(&current_locale(), key, &[])
}

pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    t_for(&current_locale(), key, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // 全局 locale 相关测试串行执行
    static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_normalize_locale() {
        assert_eq!(normalize_locale("en-US"), "en");
        assert_eq!(normalize_locale(" EN_gb "), "en");
        assert_eq!(normalize_locale("zh"), "zh-CN");
        assert_eq!(normalize_locale("fr"), "zh-CN");
        assert_eq!(normalize_locale(""), "zh-CN");
    }

    #[test]
    fn test_set_locale_normalizes() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en-US");
        assert_eq!(current_locale(), "en");
        assert!(t("import.cancellation_requested").contains("ancel"));

        set_locale("zh-CN");
        assert_eq!(current_locale(), "zh-CN");
    }

    #[test]
    fn test_t_for_ignores_global_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("zh-CN");

        let msg = t_for("en", "import.max_failures_reached", &[("max", "11")]);
        assert!(msg.contains("11"));
        assert!(msg.contains("failures"));
        assert_eq!(current_locale(), "zh-CN");

        let msg = t_with_args("import.file_not_found", &[("path", "/tmp/test.csv")]);
        assert!(msg.contains("/tmp/test.csv"));
        assert!(msg.contains("文件不存在"));
    }
}
