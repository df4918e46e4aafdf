use std::fmt;
use std::str::FromStr;

pub const ROUTE_PREFIX: &str = "/api/";

/// Known API routes. The string form is what lands in the `endpoint` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Metric,
    MetricList,
    MetricTagValues,
    Query,
    Render,
    ResetFlood,
    LegacyRedirect,
    Dashboard,
    DashboardList,
    Group,
    GroupList,
    Prometheus,
}

impl Endpoint {
    pub const ALL: [Endpoint; 12] = [
        Endpoint::Metric,
        Endpoint::MetricList,
        Endpoint::MetricTagValues,
        Endpoint::Query,
        Endpoint::Render,
        Endpoint::ResetFlood,
        Endpoint::LegacyRedirect,
        Endpoint::Dashboard,
        Endpoint::DashboardList,
        Endpoint::Group,
        Endpoint::GroupList,
        Endpoint::Prometheus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::Metric => "metric",
            Endpoint::MetricList => "metrics-list",
            Endpoint::MetricTagValues => "metric-tag-values",
            Endpoint::Query => "query",
            Endpoint::Render => "render",
            Endpoint::ResetFlood => "reset-flood",
            Endpoint::LegacyRedirect => "legacy-redirect",
            Endpoint::Dashboard => "dashboard",
            Endpoint::DashboardList => "dashboards-list",
            Endpoint::Group => "group",
            Endpoint::GroupList => "group-list",
            Endpoint::Prometheus => "prometheus",
        }
    }

    /// Router path, e.g. `/api/metrics-list`.
    pub fn path(self) -> String {
        format!("{ROUTE_PREFIX}{}", self.as_str())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown endpoint {0:?}")]
pub struct UnknownEndpoint(pub String);

impl FromStr for Endpoint {
    type Err = UnknownEndpoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| UnknownEndpoint(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for e in Endpoint::ALL {
            assert_eq!(e.as_str().parse::<Endpoint>(), Ok(e));
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert_eq!(
            "dashboards".parse::<Endpoint>(),
            Err(UnknownEndpoint("dashboards".into()))
        );
    }

    #[test]
    fn path_carries_route_prefix() {
        assert_eq!(Endpoint::MetricList.path(), "/api/metrics-list");
        assert_eq!(Endpoint::DashboardList.to_string(), "dashboards-list");
    }
}
