//! AMap (Gaode) MCP capabilities.
//!
//! These mirror the tools the AMap MCP server exposes, with descriptions in
//! Chinese because they are rendered verbatim into the planning prompt.

use stepwise_core::tool::{CapabilityDescriptor, ParameterSchema, PropertySchema};

const ORIGIN: &str = "出发点经纬度，坐标格式为：经度，纬度";
const DESTINATION: &str = "目的地经纬度，坐标格式为：经度，纬度";

fn route(name: &str, description: &str) -> CapabilityDescriptor {
    CapabilityDescriptor::new(
        name,
        description,
        ParameterSchema::default()
            .require("origin", PropertySchema::string(ORIGIN))
            .require("destination", PropertySchema::string(DESTINATION)),
    )
}

pub fn direction_bicycling() -> CapabilityDescriptor {
    route(
        "maps_direction_bicycling",
        "骑行路径规划用于规划骑行通勤方案，规划时会考虑天桥、单行线、封路等情况。最大支持 500km 的骑行路线规划",
    )
}

pub fn direction_driving() -> CapabilityDescriptor {
    route(
        "maps_direction_driving",
        "驾车路径规划 API 可以根据用户起终点经纬度坐标规划以小客车、轿车通勤出行的方案，并且返回通勤方案的数据。",
    )
}

pub fn direction_transit_integrated() -> CapabilityDescriptor {
    CapabilityDescriptor::new(
        "maps_direction_transit_integrated",
        "根据用户起终点经纬度坐标规划综合各类公共（火车、公交、地铁）交通方式的通勤方案，并且返回通勤方案的数据，跨城场景下必须传起点城市与终点城市",
        ParameterSchema::default()
            .require("origin", PropertySchema::string(ORIGIN))
            .require("destination", PropertySchema::string(DESTINATION))
            .require("city", PropertySchema::string("公共交通规划起点城市"))
            .require("cityd", PropertySchema::string("公共交通规划终点城市")),
    )
}

pub fn direction_walking() -> CapabilityDescriptor {
    CapabilityDescriptor::new(
        "maps_direction_walking",
        "根据输入起点终点经纬度坐标规划100km 以内的步行通勤方案，并且返回通勤方案的数据",
        ParameterSchema::default()
            .require("origin", PropertySchema::string("出发点经度，纬度，坐标格式为：经度，纬度"))
            .require("destination", PropertySchema::string("目的地经度，纬度，坐标格式为：经度，纬度")),
    )
}

pub fn distance() -> CapabilityDescriptor {
    CapabilityDescriptor::new(
        "maps_distance",
        "测量两个经纬度坐标之间的距离,支持驾车、步行以及球面距离测量",
        ParameterSchema::default()
            .require(
                "origins",
                PropertySchema::string(
                    "起点经度，纬度，可以传多个坐标，使用分号隔离，比如120,30;120,31，坐标格式为：经度，纬度",
                ),
            )
            .require("destination", PropertySchema::string("终点经度，纬度，坐标格式为：经度，纬度"))
            .optional(
                "type",
                PropertySchema::string("距离测量类型,1代表驾车距离测量，0代表直线距离测量，3步行距离测量"),
            ),
    )
}

pub fn geo() -> CapabilityDescriptor {
    CapabilityDescriptor::new(
        "maps_geo",
        "将详细的结构化地址转换为经纬度坐标。支持对地标性名胜景区、建筑物名称解析为经纬度坐标",
        ParameterSchema::default()
            .require("address", PropertySchema::string("待解析的结构化地址信息"))
            .optional("city", PropertySchema::string("指定查询的城市")),
    )
}

pub fn regeocode() -> CapabilityDescriptor {
    CapabilityDescriptor::new(
        "maps_regeocode",
        "将一个高德经纬度坐标转换为行政区划地址信息",
        ParameterSchema::default().require("location", PropertySchema::string("经纬度")),
    )
}

pub fn ip_location() -> CapabilityDescriptor {
    CapabilityDescriptor::new(
        "maps_ip_location",
        "IP 定位根据用户输入的 IP 地址，定位 IP 的所在位置",
        ParameterSchema::default().require("ip", PropertySchema::string("IP地址")),
    )
}

pub fn around_search() -> CapabilityDescriptor {
    CapabilityDescriptor::new(
        "maps_around_search",
        "周边搜，根据用户传入关键词以及坐标location，搜索出radius半径范围的POI",
        ParameterSchema::default()
            .require("keywords", PropertySchema::string("搜索关键词"))
            .require("location", PropertySchema::string("中心点经度纬度"))
            .optional("radius", PropertySchema::string("搜索半径")),
    )
}

pub fn search_detail() -> CapabilityDescriptor {
    CapabilityDescriptor::new(
        "maps_search_detail",
        "查询关键词搜或者周边搜获取到的POI ID的详细信息",
        ParameterSchema::default()
            .require("id", PropertySchema::string("关键词搜或者周边搜获取到的POI ID")),
    )
}

pub fn text_search() -> CapabilityDescriptor {
    CapabilityDescriptor::new(
        "maps_text_search",
        "关键字搜索 API 根据用户输入的关键字进行 POI 搜索，并返回相关的信息",
        ParameterSchema::default()
            .require("keywords", PropertySchema::string("查询关键字"))
            .optional("city", PropertySchema::string("查询城市"))
            .optional(
                "citylimit",
                PropertySchema::typed("boolean", "是否限制城市范围内搜索，默认不限制")
                    .with_default(serde_json::Value::Bool(false)),
            ),
    )
}

pub fn weather() -> CapabilityDescriptor {
    CapabilityDescriptor::new(
        "maps_weather",
        "根据城市名称或者标准adcode查询指定城市的天气",
        ParameterSchema::default().require("city", PropertySchema::string("城市名称或者adcode")),
    )
}

/// All AMap capabilities, in prompt order.
pub fn descriptors() -> Vec<CapabilityDescriptor> {
    vec![
        direction_bicycling(),
        direction_driving(),
        direction_transit_integrated(),
        direction_walking(),
        distance(),
        geo(),
        regeocode(),
        ip_location(),
        around_search(),
        search_detail(),
        text_search(),
        weather(),
    ]
}
