//! # XML 元素树
//!
//! 用 `roxmltree` 解析后立即转为自有的元素树（标签本地名、属性、文本、子元素），
//! 之后的导航不再受原始文本生命周期约束。
//!
//! ## 路径语法
//! - `a/b/c`：逐级匹配子元素
//! - `a/b[@name=x]`：带属性谓词，值可加引号
//!
//! 解析失败不是错误：记录警告并返回 `None`，相应物理量随之缺失。
//!
//! ## 依赖关系
//! - 被 `xml/cast.rs` 和各应用的 XML 导航器使用

use crate::error::Result;
use crate::extract::read_text_lossy;
use log::warn;
use std::path::Path;

/// 自有 XML 元素
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

/// 单级路径：标签名 + 可选属性谓词
#[derive(Debug, Clone, PartialEq)]
struct Step<'p> {
    tag: &'p str,
    predicate: Option<(&'p str, &'p str)>,
}

impl<'p> Step<'p> {
    fn parse(segment: &'p str) -> Step<'p> {
        let segment = segment.trim();
        let (tag, rest) = match segment.find('[') {
            Some(pos) => (&segment[..pos], Some(&segment[pos..])),
            None => (segment, None),
        };

        let predicate = rest.and_then(|r| {
            let inner = r.trim_start_matches('[').trim_end_matches(']').trim();
            let inner = inner.strip_prefix('@')?;
            let (key, value) = inner.split_once('=')?;
            Some((key.trim(), value.trim().trim_matches(['"', '\''])))
        });

        Step { tag, predicate }
    }

    fn matches(&self, node: &XmlNode) -> bool {
        if self.tag != "*" && node.name != self.tag {
            return false;
        }
        match self.predicate {
            Some((key, value)) => node.attr(key) == Some(value),
            None => true,
        }
    }
}

fn split_path(path: &str) -> Vec<Step<'_>> {
    path.split('/')
        .filter(|s| !s.trim().is_empty())
        .map(Step::parse)
        .collect()
}

impl XmlNode {
    fn from_roxml(node: roxmltree::Node) -> XmlNode {
        let attributes = node
            .attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect();

        let text = node
            .children()
            .filter(|c| c.is_text())
            .filter_map(|c| c.text())
            .collect::<String>();

        let children = node
            .children()
            .filter(|c| c.is_element())
            .map(XmlNode::from_roxml)
            .collect();

        XmlNode {
            name: node.tag_name().name().to_string(),
            attributes,
            text,
            children,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 去除首尾空白的文本
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// 按路径取第一个匹配元素
    pub fn find(&self, path: &str) -> Option<&XmlNode> {
        self.find_all(path).into_iter().next()
    }

    /// 按路径取全部匹配元素（文档顺序）
    pub fn find_all(&self, path: &str) -> Vec<&XmlNode> {
        let mut current = vec![self];
        for step in split_path(path) {
            current = current
                .into_iter()
                .flat_map(|n| n.children.iter())
                .filter(|c| step.matches(c))
                .collect();
            if current.is_empty() {
                break;
            }
        }
        current
    }

    /// 路径末端元素的文本
    pub fn find_text(&self, path: &str) -> Option<&str> {
        self.find(path).map(XmlNode::text)
    }

    /// 先序遍历所有同名后代
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a XmlNode> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlNode>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect_named(name, found);
        }
    }

    /// 文本按空白切分为浮点数
    pub fn floats(&self) -> Option<Vec<f64>> {
        crate::extract::parse_floats(self.text())
    }

    pub fn float(&self) -> Option<f64> {
        crate::extract::parse_f64(self.text())
    }

    pub fn vec3(&self) -> Option<[f64; 3]> {
        match self.floats()?.as_slice() {
            [x, y, z] => Some([*x, *y, *z]),
            _ => None,
        }
    }
}

/// 已解析的 XML 文档
#[derive(Debug, Clone, PartialEq)]
pub struct XmlTree {
    root: XmlNode,
}

impl XmlTree {
    /// 解析文本；失败时警告并返回 `None`
    pub fn parse(text: &str) -> Option<XmlTree> {
        match roxmltree::Document::parse(text) {
            Ok(doc) => Some(XmlTree {
                root: XmlNode::from_roxml(doc.root_element()),
            }),
            Err(e) => {
                warn!("Malformed XML document: {}", e);
                None
            }
        }
    }

    /// 读取并解析文件；文件不存在时返回 `Ok(None)`
    pub fn from_file(path: &Path) -> Result<Option<XmlTree>> {
        if !path.is_file() {
            return Ok(None);
        }

        let text = read_text_lossy(path)?;
        let tree = XmlTree::parse(&text);
        if tree.is_none() {
            warn!("Ignoring unparseable XML file: {}", path.display());
        }
        Ok(tree)
    }

    pub fn root(&self) -> &XmlNode {
        &self.root
    }

    pub fn find(&self, path: &str) -> Option<&XmlNode> {
        self.root.find(path)
    }

    pub fn find_all(&self, path: &str) -> Vec<&XmlNode> {
        self.root.find_all(path)
    }

    pub fn find_text(&self, path: &str) -> Option<&str> {
        self.root.find_text(path)
    }

    pub fn descendants_named(&self, name: &str) -> Vec<&XmlNode> {
        self.root.descendants_named(name)
    }
}
