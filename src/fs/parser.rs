use std::collections::BTreeMap;

#[derive(Debug)]
pub struct ParsedTask {
    pub title: String,
    pub metadata: BTreeMap<String, String>,
    pub content: String,
}

/// Simple markdown parser for task files
/// Format:
/// ```text
/// # Task Title
///
/// key: value
/// key2: value2
///
/// Content body...
/// ```
///
/// The metadata block ends at the first blank line after it, so body lines
/// shaped like `key: value` stay in the content.
pub fn parse_task_md(content: &str) -> Result<ParsedTask, String> {
    let lines: Vec<&str> = content.lines().collect();

    if lines.is_empty() {
        return Err("Empty file".to_string());
    }

    // 第一行必须是标题（允许空标题，表单编辑中的任务可能还没有标题）
    let heading = lines[0].trim_start();
    if !heading.starts_with('#') {
        return Err("No title found".to_string());
    }
    // `#` 后的一个空格是分隔符，其余空白属于标题
    let title = heading.trim_start_matches('#');
    let title = title.strip_prefix(' ').unwrap_or(title).to_string();

    let mut metadata = BTreeMap::new();
    let mut content_lines: Vec<&str> = Vec::new();
    let mut in_metadata = false;
    let mut in_content = false;

    for line in &lines[1..] {
        if !in_content {
            let trimmed = line.trim();

            if trimmed.is_empty() {
                // 元数据后的空行结束元数据块
                if in_metadata {
                    in_content = true;
                }
                continue;
            }

            if let Some(colon_pos) = trimmed.find(':') {
                let key = trimmed[..colon_pos].trim();
                let value = trimmed[colon_pos + 1..].trim();

                if !key.is_empty() && !key.contains(char::is_whitespace) {
                    metadata.insert(key.to_string(), value.to_string());
                    in_metadata = true;
                    continue;
                }
            }
            // 不是 key: value，正文开始
            in_content = true;
        }

        content_lines.push(*line);
    }

    Ok(ParsedTask {
        title,
        metadata,
        content: content_lines.join("\n").trim_matches('\n').to_string(),
    })
}

/// 生成任务的 markdown 内容
pub fn generate_task_md(title: &str, metadata: &BTreeMap<String, String>, content: &str) -> String {
    let mut output = format!("# {}\n\n", title);

    // 写入元数据
    for (key, value) in metadata {
        output.push_str(&format!("{}: {}\n", key, value));
    }

    // Write content if exists
    if !content.is_empty() {
        output.push('\n');
        output.push_str(content);
        output.push('\n');
    }

    output
}
