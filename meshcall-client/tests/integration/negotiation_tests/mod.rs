mod test_glare_lower_id_keeps_offer;
mod test_negotiation_failure_isolated;
