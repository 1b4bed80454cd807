//! Planning prompt construction.

use stepwise_core::tool::CapabilityCatalog;

const PLANNING_INTRO: &str = concat!(
    "你是一个助手，根据用户已有的信息和可用工具，制定出一系列可执行的步骤。（如果工具需要的信息缺失就不要加到步骤中）",
    "每一步都应是调用工具可以完成的具体操作，每一个步中只能有一个工具，步骤应清晰具体，逻辑合理。",
    "使用英文逗号 `。` 分隔每个步骤，不要换行，最多3步。用中文回复。\n\n",
    "当前可用的工具如下：\n",
);

/// System instruction asking the model for at most three `。`-delimited
/// steps, one capability per step, listing the catalog in its order.
pub fn build_planning_prompt(catalog: &CapabilityCatalog) -> String {
    let tools = catalog
        .describe()
        .iter()
        .map(|d| format!("- {}：{}；", d.name, d.description))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{PLANNING_INTRO}{tools}")
}

/// Prompt for folding one tool result into an observation.
pub fn build_summary_prompt(context: &str, tool_output: &str) -> String {
    format!("{context}\n\n工具调用结果: {tool_output},整合数据信息")
}

/// Prompt for the final answer.
pub fn build_final_prompt(context: &str) -> String {
    format!("根据以下信息给出最终结果:\n{context}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_core::tool::{CapabilityDescriptor, ParameterSchema, PropertySchema};

    fn catalog() -> CapabilityCatalog {
        CapabilityCatalog::new(vec![
            CapabilityDescriptor::new(
                "maps_weather",
                "根据城市名称或者标准adcode查询指定城市的天气",
                ParameterSchema::default().require("city", PropertySchema::string("城市名称或者adcode")),
            ),
            CapabilityDescriptor::new("maps_geo", "地址转经纬度", ParameterSchema::default()),
        ])
        .unwrap()
    }

    #[test]
    fn one_line_per_capability_in_order() {
        let prompt = build_planning_prompt(&catalog());
        assert!(prompt.starts_with("你是一个助手"));
        assert!(prompt.contains("最多3步"));
        assert!(prompt.ends_with(
            "当前可用的工具如下：\n- maps_weather：根据城市名称或者标准adcode查询指定城市的天气；\n- maps_geo：地址转经纬度；"
        ));
    }

    #[test]
    fn deterministic() {
        assert_eq!(build_planning_prompt(&catalog()), build_planning_prompt(&catalog()));
    }

    #[test]
    fn empty_catalog_still_has_intro() {
        let prompt = build_planning_prompt(&CapabilityCatalog::new(vec![]).unwrap());
        assert!(prompt.ends_with("当前可用的工具如下：\n"));
    }

    #[test]
    fn summary_and_final_prompts_carry_context() {
        let summary = build_summary_prompt("用户需求：x", "上海：晴");
        assert!(summary.starts_with("用户需求：x"));
        assert!(summary.ends_with("工具调用结果: 上海：晴,整合数据信息"));
        assert_eq!(build_final_prompt("ctx"), "根据以下信息给出最终结果:\nctx");
    }
}
