pub mod builder;
pub mod logical_aggregate;
pub mod logical_command;
pub mod logical_filter;
pub mod logical_generate;
pub mod logical_join;
pub mod logical_limit;
pub mod logical_local;
pub mod logical_map;
pub mod logical_order;
pub mod logical_project;
pub mod logical_range;
pub mod logical_repartition;
pub mod logical_sample;
pub mod logical_setop;
pub mod logical_subquery_alias;
pub mod operator;
pub mod resolver;
pub mod self_join;
pub mod split;
